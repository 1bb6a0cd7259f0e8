//! Write command
// (c) 2026 Ross Younger

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use super::handler::{CommandHandler, HandlerContext, RequestContext};
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::header::{WriteData, WritePacing, WriteRequest};
use crate::protocol::{Status, path::path_length};
use crate::store::{Store, StoreError};
use crate::transport::{Exchange, PacketTransport};
use crate::util::time::now_unix_nanos;

/// Arguments to a write
#[derive(Debug)]
pub(crate) struct WriteArgs {
    pub(crate) path: String,
    pub(crate) contents: Bytes,
    /// Where in the file the contents go
    pub(crate) offset: u32,
    /// Defaults to now
    pub(crate) modification_time: Option<u64>,
}

pub(crate) struct WriteHandler;

/// Tells the responder to abandon the write. Best effort; we are already failing.
async fn poison<T: PacketTransport>(ex: &mut Exchange<'_, T>) {
    let poison = WriteData {
        status: Status::ErrorProtocol,
        offset: 0,
        free_space: 0,
    };
    if let Err(e) = ex.send_header(&poison).await {
        debug!("could not abort write: {e}");
    }
}

#[async_trait]
impl CommandHandler for WriteHandler {
    type Args = WriteArgs;
    type Output = u64;
    type Request = WriteRequest;
    type Response = WritePacing;

    fn failure(status: Status) -> WritePacing {
        WritePacing::failure(status)
    }

    async fn send_impl<'a, T: PacketTransport>(
        &self,
        inner: &mut RequestContext<'a, T>,
        args: WriteArgs,
    ) -> Result<u64> {
        let ex = &mut inner.exchange;
        let too_big = || {
            Error::new(
                ErrorKind::WriteRejected,
                format!("write {}: file too large", args.path),
            )
        };
        let length = u32::try_from(args.contents.len()).map_err(|_| too_big())?;
        let total = args.offset.checked_add(length).ok_or_else(too_big)?;
        let request = WriteRequest {
            path_length: path_length(&args.path)?,
            offset: args.offset,
            modification_time: args.modification_time.unwrap_or_else(now_unix_nanos),
            total_length: total,
        };
        ex.send_with_payload(&request, args.path.as_bytes()).await?;

        let mut written = 0u32;
        loop {
            let pacing: WritePacing = match ex.receive_header().await {
                Ok(p) => p,
                Err(e) if e.kind().is_some() => {
                    poison(ex).await;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            if pacing.status != Status::Ok {
                return Err(Error::new(
                    ErrorKind::WriteRejected,
                    format!("write {}: {}", args.path, pacing.status),
                ));
            }
            let expected = args.offset + written;
            if pacing.offset != expected {
                poison(ex).await;
                return Err(Error::protocol(format!(
                    "write pacing at offset {}, expected {expected}",
                    pacing.offset
                )));
            }
            if written == length {
                trace!("write complete");
                return Ok(pacing.modification_time);
            }
            let remaining = length - written;
            if pacing.free_space == 0 || pacing.free_space > remaining {
                poison(ex).await;
                return Err(Error::protocol(format!(
                    "granted {} bytes with {remaining} remaining",
                    pacing.free_space
                )));
            }

            let chunk = WriteData {
                status: Status::Ok,
                offset: expected,
                free_space: pacing.free_space,
            };
            let data = &args.contents[written as usize..(written + pacing.free_space) as usize];
            ex.send_with_payload(&chunk, data).await?;
            written += pacing.free_space;
        }
    }

    async fn handle_impl<'a, T: PacketTransport, S: Store>(
        &self,
        inner: &mut HandlerContext<'a, T, S>,
        request: WriteRequest,
    ) -> Result<()> {
        let path = inner.read_path::<Self>(request.path_length).await?;
        let total = request.total_length;
        if request.offset > total {
            debug!(
                "write {path}: offset {} is beyond length {total}",
                request.offset
            );
            return inner.refuse::<Self>(Status::Error).await;
        }
        let mut contents = match inner.store.read_file(&path).await {
            Ok(c) => c,
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => {
                debug!("write {path}: {e}");
                return inner.refuse::<Self>(Status::Error).await;
            }
        };
        contents.resize(total as usize, 0);

        let max_chunk = inner.config.chunk_limit();
        let ex = &mut inner.exchange;
        let mut offset = request.offset;
        while offset < total {
            let grant = (total - offset).min(max_chunk);
            trace!("grant {grant} at {offset}");
            let pacing = WritePacing {
                status: Status::Ok,
                offset,
                modification_time: 0,
                free_space: grant,
            };
            ex.send_header(&pacing).await?;

            let data: WriteData = match ex.receive_header().await {
                Ok(d) => d,
                Err(e) if e.kind().is_some() => {
                    ex.send_header(&Self::failure(Status::ErrorProtocol))
                        .await?;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            if data.status != Status::Ok {
                debug!("write {path}: requester abandoned at {offset}");
                return Ok(());
            }
            if data.offset != offset || data.free_space != grant {
                ex.send_header(&Self::failure(Status::ErrorProtocol))
                    .await?;
                return Err(Error::protocol(format!(
                    "expected {grant} bytes at {offset}, got {} at {}",
                    data.free_space, data.offset
                )));
            }
            let chunk = ex.take(grant as usize).await?;
            contents[offset as usize..(offset + grant) as usize].copy_from_slice(&chunk);
            offset += grant;
        }

        match inner
            .store
            .write_file(&path, contents, request.modification_time)
            .await
        {
            Ok(modification_time) => {
                let done = WritePacing {
                    status: Status::Ok,
                    offset: total,
                    modification_time,
                    free_space: 0,
                };
                inner.exchange.send_header(&done).await
            }
            Err(e) => {
                debug!("write {path}: {e}");
                inner.refuse::<Self>(Status::Error).await
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::{WriteArgs, WriteHandler};
    use crate::config::Configuration;
    use crate::error::{ErrorKind, Result};
    use crate::protocol::header::{WriteData, WritePacing, WriteRequest};
    use crate::protocol::{Status, WireHeader as _};
    use crate::session::test::{new_test_plumbing, requester, responder, run};
    use crate::store::{MemoryStore, Store as _};
    use crate::transport::Exchange;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn args(path: &str, contents: &[u8], offset: u32) -> WriteArgs {
        WriteArgs {
            path: path.into(),
            contents: Bytes::copy_from_slice(contents),
            offset,
            modification_time: Some(1_000),
        }
    }

    fn small_chunks() -> Configuration {
        Configuration {
            read_chunk_size: 16,
            max_chunk_size: 16,
        }
    }

    #[tokio::test]
    async fn write_new_file() {
        let mut store = MemoryStore::new();
        let contents: Vec<u8> = (0..100).collect();
        let (r1, r2) = run(
            &WriteHandler,
            args("/f", &contents, 0),
            &mut store,
            &small_chunks(),
        )
        .await;
        r2.unwrap();
        assert_eq!(r1.unwrap(), 1_000);
        assert_eq!(store.read_file("/f").await.unwrap(), contents);
    }

    #[tokio::test]
    async fn stored_time_is_returned() {
        let mut store = MemoryStore::new().with_time_resolution(1_000_000_000);
        let mut a = args("/f", b"x", 0);
        a.modification_time = Some(3_700_000_001);
        let (r1, r2) = run(&WriteHandler, a, &mut store, &small_chunks()).await;
        r2.unwrap();
        assert_eq!(r1.unwrap(), 3_000_000_000);
    }

    #[tokio::test]
    async fn empty_write() {
        let mut store = MemoryStore::new();
        let (r1, r2) = run(
            &WriteHandler,
            args("/f", b"", 0),
            &mut store,
            &small_chunks(),
        )
        .await;
        r2.unwrap();
        let _ = r1.unwrap();
        assert!(store.read_file("/f").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_at_offset() {
        let mut store = MemoryStore::new();
        let _ = store
            .write_file("/f", b"abcdefgh".to_vec(), 0)
            .await
            .unwrap();
        let config = small_chunks();

        // overwrite in the middle: the tail goes
        let (_, r2) = run(&WriteHandler, args("/f", b"XY", 2), &mut store, &config).await;
        r2.unwrap();
        assert_eq!(store.read_file("/f").await.unwrap(), b"abXY");

        // beyond the end: the gap is zero-filled
        let (_, r2) = run(&WriteHandler, args("/f", b"Z", 6), &mut store, &config).await;
        r2.unwrap();
        assert_eq!(store.read_file("/f").await.unwrap(), b"abXY\0\0Z");
    }

    #[tokio::test]
    async fn unwritable_target() {
        let mut store = MemoryStore::new();
        let _ = store.create_directory("/d", 0).await.unwrap();
        let config = small_chunks();
        let (r1, r2) = run(&WriteHandler, args("/d", b"x", 0), &mut store, &config).await;
        r2.unwrap();
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::WriteRejected));

        let (r1, r2) = run(
            &WriteHandler,
            args("/nodir/f", b"x", 0),
            &mut store,
            &config,
        )
        .await;
        r2.unwrap();
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::WriteRejected));
    }

    #[tokio::test]
    async fn offset_beyond_total_is_refused() {
        let mut store = MemoryStore::new();
        let (mut a, b) = new_test_plumbing();
        let config = small_chunks();
        let script = async move {
            let mut ex = Exchange::new(&mut a);
            let request = WriteRequest {
                path_length: 2,
                offset: 10,
                modification_time: 0,
                total_length: 5,
            };
            ex.send_with_payload(&request, b"/f").await.unwrap();
            ex.receive_header::<WritePacing>().await.unwrap()
        };
        let (reply, r2) = tokio::join!(script, responder(&WriteHandler, b, &mut store, &config));
        r2.unwrap();
        assert_eq!(reply.status, Status::Error);
        assert!(!store.exists("/f"));
    }

    #[tokio::test]
    async fn responder_never_oversteps() {
        let mut store = MemoryStore::new();
        let (mut a, b) = new_test_plumbing();
        let config = Configuration {
            read_chunk_size: 7,
            max_chunk_size: 7,
        };
        let script = async move {
            let mut ex = Exchange::new(&mut a);
            let request = WriteRequest {
                path_length: 2,
                offset: 3,
                modification_time: 0,
                total_length: 25,
            };
            ex.send_with_payload(&request, b"/f").await.unwrap();
            let mut grants = Vec::new();
            loop {
                let p: WritePacing = ex.receive_header().await.unwrap();
                assert_eq!(p.status, Status::Ok);
                if p.free_space == 0 {
                    assert_eq!(p.offset, 25);
                    break;
                }
                assert!(p.offset + p.free_space <= 25);
                grants.push(p.free_space);
                let d = WriteData {
                    status: Status::Ok,
                    offset: p.offset,
                    free_space: p.free_space,
                };
                ex.send_with_payload(&d, &vec![b'x'; p.free_space as usize])
                    .await
                    .unwrap();
            }
            grants
        };
        let (grants, r2) = tokio::join!(script, responder(&WriteHandler, b, &mut store, &config));
        r2.unwrap();
        assert_eq!(grants, [7, 7, 7, 1]);
    }

    #[tokio::test]
    async fn zero_max_chunk_still_grants() {
        let mut store = MemoryStore::new();
        let config = Configuration {
            read_chunk_size: 16,
            max_chunk_size: 0,
        };
        let (mut a, b) = new_test_plumbing();
        let script = async move {
            let mut ex = Exchange::new(&mut a);
            let request = WriteRequest {
                path_length: 2,
                offset: 0,
                modification_time: 0,
                total_length: 5,
            };
            ex.send_with_payload(&request, b"/f").await.unwrap();
            let p: WritePacing = ex.receive_header().await.unwrap();
            let abort = WriteData {
                status: Status::Error,
                offset: 0,
                free_space: 0,
            };
            ex.send_header(&abort).await.unwrap();
            p
        };
        let (first, r2) = tokio::join!(script, responder(&WriteHandler, b, &mut store, &config));
        r2.unwrap();
        assert_eq!(first.status, Status::Ok);
        assert_eq!(first.free_space, 1);

        let (r1, r2) = run(&WriteHandler, args("/f", b"hello", 0), &mut store, &config).await;
        r2.unwrap();
        let _ = r1.unwrap();
        assert_eq!(store.read_file("/f").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn abandoned_write_commits_nothing() {
        let mut store = MemoryStore::new();
        let _ = store.write_file("/f", b"original".to_vec(), 0).await.unwrap();
        let (mut a, b) = new_test_plumbing();
        let config = small_chunks();
        let script = async move {
            let mut ex = Exchange::new(&mut a);
            let request = WriteRequest {
                path_length: 2,
                offset: 0,
                modification_time: 0,
                total_length: 40,
            };
            ex.send_with_payload(&request, b"/f").await.unwrap();
            let p: WritePacing = ex.receive_header().await.unwrap();
            let d = WriteData {
                status: Status::Ok,
                offset: 0,
                free_space: p.free_space,
            };
            ex.send_with_payload(&d, &vec![0u8; p.free_space as usize])
                .await
                .unwrap();
            let _: WritePacing = ex.receive_header().await.unwrap();
            let abort = WriteData {
                status: Status::Error,
                offset: 0,
                free_space: 0,
            };
            ex.send_header(&abort).await.unwrap();
        };
        let ((), r2) = tokio::join!(script, responder(&WriteHandler, b, &mut store, &config));
        r2.unwrap();
        assert_eq!(store.read_file("/f").await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn responder_rejects_mismatched_data() {
        let mut store = MemoryStore::new();
        let (mut a, b) = new_test_plumbing();
        let config = small_chunks();
        let script = async move {
            let mut ex = Exchange::new(&mut a);
            let request = WriteRequest {
                path_length: 2,
                offset: 0,
                modification_time: 0,
                total_length: 40,
            };
            ex.send_with_payload(&request, b"/f").await.unwrap();
            let p: WritePacing = ex.receive_header().await.unwrap();
            // more than we were granted
            let d = WriteData {
                status: Status::Ok,
                offset: 0,
                free_space: p.free_space + 1,
            };
            ex.send_with_payload(&d, &vec![0u8; p.free_space as usize + 1])
                .await
                .unwrap();
            ex.receive_header::<WritePacing>().await.unwrap()
        };
        let (reply, r2) = tokio::join!(script, responder(&WriteHandler, b, &mut store, &config));
        assert_eq!(reply.status, Status::ErrorProtocol);
        assert_eq!(r2.unwrap_err().kind(), Some(ErrorKind::Protocol));
        assert!(!store.exists("/f"));
    }

    /// Runs the requester against a scripted responder which sends `replies` after the request,
    /// then reports the next message the requester sends
    async fn requester_against(replies: Vec<Vec<u8>>) -> (Result<u64>, Option<WriteData>) {
        let (a, mut b) = new_test_plumbing();
        let config = small_chunks();
        let script = async move {
            let mut ex = Exchange::new(&mut b);
            let _: WriteRequest = ex.receive_header().await.unwrap();
            let _ = ex.read_path(2).await.unwrap();
            for r in replies {
                ex.send(&r).await.unwrap();
            }
            ex.receive_header::<WriteData>().await.ok()
        };
        tokio::join!(
            requester(&WriteHandler, args("/f", b"0123456789", 0), a, &config),
            script
        )
    }

    fn pacing(offset: u32, free_space: u32) -> Vec<u8> {
        WritePacing {
            status: Status::Ok,
            offset,
            modification_time: 0,
            free_space,
        }
        .encode()
        .to_vec()
    }

    fn is_poison(d: Option<WriteData>) -> bool {
        d.is_some_and(|d| d.status == Status::ErrorProtocol)
    }

    #[tokio::test]
    async fn requester_poisons_wrong_command() {
        let (r1, next) = requester_against(vec![vec![0x11, 1, 0, 0]]).await;
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::Protocol));
        assert!(is_poison(next));
    }

    #[tokio::test]
    async fn requester_poisons_wrong_offset() {
        let (r1, next) = requester_against(vec![pacing(3, 4)]).await;
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::Protocol));
        assert!(is_poison(next));
    }

    #[tokio::test]
    async fn requester_poisons_zero_grant() {
        let (r1, next) = requester_against(vec![pacing(0, 0)]).await;
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::Protocol));
        assert!(is_poison(next));
    }

    #[tokio::test]
    async fn requester_poisons_over_grant() {
        let (r1, next) = requester_against(vec![pacing(0, 11)]).await;
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::Protocol));
        assert!(is_poison(next));
    }

    #[tokio::test]
    async fn requester_reports_rejection() {
        let reply = WritePacing::failure(Status::Error).encode().to_vec();
        let (r1, next) = requester_against(vec![reply]).await;
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::WriteRejected));
        // no poison for an orderly refusal
        assert!(next.is_none());
    }
}
