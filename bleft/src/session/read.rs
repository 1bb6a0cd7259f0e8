//! Read command
// (c) 2026 Ross Younger

use async_trait::async_trait;
use tracing::{debug, trace};

use super::handler::{CommandHandler, HandlerContext, RequestContext};
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::header::{ReadData, ReadPacing, ReadRequest};
use crate::protocol::{Status, path::path_length};
use crate::store::Store;
use crate::transport::PacketTransport;

/// Arguments to a read
#[derive(Debug)]
pub(crate) struct ReadArgs {
    pub(crate) path: String,
    /// Where to start reading from
    pub(crate) offset: u32,
}

pub(crate) struct ReadHandler;

#[async_trait]
impl CommandHandler for ReadHandler {
    type Args = ReadArgs;
    type Output = Vec<u8>;
    type Request = ReadRequest;
    type Response = ReadData;

    fn failure(status: Status) -> ReadData {
        ReadData::failure(status)
    }

    async fn send_impl<'a, T: PacketTransport>(
        &self,
        inner: &mut RequestContext<'a, T>,
        args: ReadArgs,
    ) -> Result<Vec<u8>> {
        let preferred = inner.config.read_chunk_size;
        let ex = &mut inner.exchange;
        let start = args.offset;
        let request = ReadRequest {
            path_length: path_length(&args.path)?,
            offset: start,
            chunk_size: preferred,
        };
        ex.send_with_payload(&request, args.path.as_bytes()).await?;

        let mut current = start;
        let mut total = None;
        let mut contents = Vec::new();
        loop {
            trace!("await data at {current}");
            let data: ReadData = ex.receive_header().await?;
            if data.status != Status::Ok {
                return Err(Error::new(
                    ErrorKind::MissingFile,
                    format!("read {}: {}", args.path, data.status),
                ));
            }
            let total = *total.get_or_insert_with(|| data.total_length);
            if data.total_length != total {
                return Err(Error::protocol(format!(
                    "file length changed from {total} to {}",
                    data.total_length
                )));
            }
            if total < start {
                return Err(Error::protocol(format!(
                    "file length {total} is before requested offset {start}"
                )));
            }
            if contents.capacity() == 0 {
                contents.reserve_exact((total - start) as usize);
            }
            if data.offset != current {
                return Err(Error::protocol(format!(
                    "expected data at offset {current}, got {}",
                    data.offset
                )));
            }
            if u64::from(data.offset) + u64::from(data.chunk_length) > u64::from(total) {
                return Err(Error::protocol(format!(
                    "chunk of {} at {} overruns length {total}",
                    data.chunk_length, data.offset
                )));
            }
            if data.chunk_length == 0 && current < total {
                return Err(Error::protocol("empty chunk"));
            }

            let chunk = ex.take(data.chunk_length as usize).await?;
            contents.extend_from_slice(&chunk);
            current += data.chunk_length;
            if current == total {
                return Ok(contents);
            }

            let pacing = ReadPacing {
                status: Status::Ok,
                offset: current,
                chunk_size: preferred.min(total - current),
            };
            ex.send_header(&pacing).await?;
        }
    }

    async fn handle_impl<'a, T: PacketTransport, S: Store>(
        &self,
        inner: &mut HandlerContext<'a, T, S>,
        request: ReadRequest,
    ) -> Result<()> {
        let path = inner.read_path::<Self>(request.path_length).await?;
        let contents = match inner.store.read_file(&path).await {
            Ok(c) => c,
            Err(e) => {
                debug!("read {path}: {e}");
                return inner.refuse::<Self>(Status::from(&e)).await;
            }
        };
        let Ok(total) = u32::try_from(contents.len()) else {
            debug!("read {path}: file too large");
            return inner.refuse::<Self>(Status::Error).await;
        };
        if request.offset > total {
            debug!("read {path}: offset {} is past the end", request.offset);
            return inner.refuse::<Self>(Status::Error).await;
        }

        let max_chunk = inner.config.chunk_limit();
        let ex = &mut inner.exchange;
        let mut offset = request.offset;
        let mut requested = request.chunk_size;
        loop {
            let mut chunk = (total - offset).min(max_chunk);
            if requested > 0 {
                chunk = chunk.min(requested);
            }
            let header = ReadData {
                status: Status::Ok,
                offset,
                total_length: total,
                chunk_length: chunk,
            };
            let data = &contents[offset as usize..(offset + chunk) as usize];
            ex.send_with_payload(&header, data).await?;
            offset += chunk;
            if offset == total {
                return Ok(());
            }

            let pacing: ReadPacing = match ex.receive_header().await {
                Ok(p) => p,
                Err(e) if e.kind().is_some() => {
                    ex.send_header(&Self::failure(Status::ErrorProtocol))
                        .await?;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            if pacing.status != Status::Ok {
                debug!("read {path}: requester abandoned at {}", pacing.offset);
                return Ok(());
            }
            if pacing.offset != offset {
                ex.send_header(&Self::failure(Status::ErrorProtocol))
                    .await?;
                return Err(Error::protocol(format!(
                    "read pacing at offset {}, expected {offset}",
                    pacing.offset
                )));
            }
            requested = pacing.chunk_size;
        }
    }
}
