//! Mkdir command
// (c) 2026 Ross Younger

use async_trait::async_trait;
use tracing::debug;

use super::handler::{CommandHandler, HandlerContext, RequestContext};
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::header::{MkdirRequest, MkdirStatus};
use crate::protocol::{Status, path::path_length};
use crate::store::Store;
use crate::transport::PacketTransport;
use crate::util::time::now_unix_nanos;

#[derive(Debug)]
pub(crate) struct MkdirArgs {
    pub(crate) path: String,
    /// Defaults to now
    pub(crate) modification_time: Option<u64>,
}

pub(crate) struct MkdirHandler;

#[async_trait]
impl CommandHandler for MkdirHandler {
    type Args = MkdirArgs;
    type Output = u64;
    type Request = MkdirRequest;
    type Response = MkdirStatus;

    fn failure(status: Status) -> MkdirStatus {
        MkdirStatus {
            status,
            modification_time: 0,
        }
    }

    async fn send_impl<'a, T: PacketTransport>(
        &self,
        inner: &mut RequestContext<'a, T>,
        args: MkdirArgs,
    ) -> Result<u64> {
        let request = MkdirRequest {
            path_length: path_length(&args.path)?,
            modification_time: args.modification_time.unwrap_or_else(now_unix_nanos),
        };
        let ex = &mut inner.exchange;
        ex.send_with_payload(&request, args.path.as_bytes()).await?;
        let reply: MkdirStatus = ex.receive_header().await?;
        if reply.status != Status::Ok {
            return Err(Error::new(
                ErrorKind::InvalidPath,
                format!("mkdir {}: {}", args.path, reply.status),
            ));
        }
        Ok(reply.modification_time)
    }

    async fn handle_impl<'a, T: PacketTransport, S: Store>(
        &self,
        inner: &mut HandlerContext<'a, T, S>,
        request: MkdirRequest,
    ) -> Result<()> {
        let path = inner.read_path::<Self>(request.path_length).await?;
        let reply = match inner
            .store
            .create_directory(&path, request.modification_time)
            .await
        {
            Ok(modification_time) => MkdirStatus {
                status: Status::Ok,
                modification_time,
            },
            Err(e) => {
                debug!("mkdir {path}: {e}");
                Self::failure(Status::from(&e))
            }
        };
        inner.exchange.send_header(&reply).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::{MkdirArgs, MkdirHandler};
    use crate::config::Configuration;
    use crate::error::ErrorKind;
    use crate::protocol::header::MkdirRequest;
    use crate::session::test::{new_test_plumbing, requester, run};
    use crate::store::{MemoryStore, Store as _};
    use crate::transport::Exchange;
    use pretty_assertions::assert_eq;

    fn args(path: &str, modification_time: Option<u64>) -> MkdirArgs {
        MkdirArgs {
            path: path.into(),
            modification_time,
        }
    }

    #[tokio::test]
    async fn create_with_parents() {
        let mut store = MemoryStore::new();
        let config = Configuration::default();
        let (r1, r2) = run(
            &MkdirHandler,
            args("/a/b/c", Some(1234)),
            &mut store,
            &config,
        )
        .await;
        r2.unwrap();
        assert_eq!(r1.unwrap(), 1234);
        assert!(store.exists("/a/b"));
        assert!(store.list_directory("/a/b/c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_directory_is_fine() {
        let mut store = MemoryStore::new();
        let config = Configuration::default();
        let (r1, _) = run(&MkdirHandler, args("/d/", Some(5)), &mut store, &config).await;
        assert_eq!(r1.unwrap(), 5);
        let (r1, _) = run(&MkdirHandler, args("/d", Some(9)), &mut store, &config).await;
        assert_eq!(r1.unwrap(), 5);
    }

    #[tokio::test]
    async fn file_in_the_way() {
        let mut store = MemoryStore::new();
        let _ = store.write_file("/f", b"x".to_vec(), 0).await.unwrap();
        let config = Configuration::default();
        let (r1, r2) = run(&MkdirHandler, args("/f/sub", None), &mut store, &config).await;
        r2.unwrap();
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::InvalidPath));
    }

    #[tokio::test]
    async fn mismatched_reply() {
        let (a, mut b) = new_test_plumbing();
        let config = Configuration::default();
        let script = async move {
            let mut ex = Exchange::new(&mut b);
            let _: MkdirRequest = ex.receive_header().await.unwrap();
            let _ = ex.read_path(2).await.unwrap();
            // a DeleteStatus where MkdirStatus belongs
            ex.send(&[0x31, 0x00]).await.unwrap();
        };
        let (r1, ()) = tokio::join!(
            requester(&MkdirHandler, args("/d", None), a, &config),
            script
        );
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::Protocol));
    }
}
