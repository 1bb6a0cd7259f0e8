//! Delete command
// (c) 2026 Ross Younger

use async_trait::async_trait;
use tracing::debug;

use super::handler::{CommandHandler, HandlerContext, RequestContext};
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::header::{DeleteRequest, DeleteStatus};
use crate::protocol::{Status, path::path_length};
use crate::store::Store;
use crate::transport::PacketTransport;

pub(crate) struct DeleteHandler;

#[async_trait]
impl CommandHandler for DeleteHandler {
    /// The path to delete
    type Args = String;
    type Output = ();
    type Request = DeleteRequest;
    type Response = DeleteStatus;

    fn failure(status: Status) -> DeleteStatus {
        DeleteStatus { status }
    }

    async fn send_impl<'a, T: PacketTransport>(
        &self,
        inner: &mut RequestContext<'a, T>,
        path: String,
    ) -> Result<()> {
        let request = DeleteRequest {
            path_length: path_length(&path)?,
        };
        let ex = &mut inner.exchange;
        ex.send_with_payload(&request, path.as_bytes()).await?;
        let reply: DeleteStatus = ex.receive_header().await?;
        if reply.status != Status::Ok {
            return Err(Error::new(
                ErrorKind::MissingFile,
                format!("delete {path}: {}", reply.status),
            ));
        }
        Ok(())
    }

    async fn handle_impl<'a, T: PacketTransport, S: Store>(
        &self,
        inner: &mut HandlerContext<'a, T, S>,
        request: DeleteRequest,
    ) -> Result<()> {
        let path = inner.read_path::<Self>(request.path_length).await?;
        let status = match inner.store.delete(&path).await {
            Ok(()) => Status::Ok,
            Err(e) => {
                debug!("delete {path}: {e}");
                Status::from(&e)
            }
        };
        inner.exchange.send_header(&DeleteStatus { status }).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::DeleteHandler;
    use crate::config::Configuration;
    use crate::error::ErrorKind;
    use crate::protocol::header::{DeleteRequest, MkdirStatus};
    use crate::protocol::{Status, WireHeader as _};
    use crate::session::test::{new_test_plumbing, requester, run};
    use crate::store::{MemoryStore, Store as _};
    use crate::transport::Exchange;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    async fn populated() -> MemoryStore {
        let mut store = MemoryStore::new();
        let _ = store.write_file("/f", b"x".to_vec(), 0).await.unwrap();
        let _ = store.create_directory("/empty", 0).await.unwrap();
        let _ = store.create_directory("/full", 0).await.unwrap();
        let _ = store.write_file("/full/g", b"y".to_vec(), 0).await.unwrap();
        store
    }

    #[rstest]
    #[case("/f")]
    #[case("/empty")]
    #[case("/full/g")]
    #[tokio::test]
    async fn deletable(#[case] path: &str) {
        let mut store = populated().await;
        let config = Configuration::default();
        let (r1, r2) = run(&DeleteHandler, path.into(), &mut store, &config).await;
        r2.unwrap();
        r1.unwrap();
        assert!(!store.exists(path));
    }

    #[rstest]
    #[case("/full")]
    #[case("/missing")]
    #[case("/")]
    #[case("relative")]
    #[tokio::test]
    async fn not_deletable(#[case] path: &str) {
        let mut store = populated().await;
        let config = Configuration::default();
        let (r1, r2) = run(&DeleteHandler, path.into(), &mut store, &config).await;
        r2.unwrap();
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::MissingFile));
        assert!(store.exists("/full/g"));
    }

    #[tokio::test]
    async fn reply_for_another_command() {
        let (a, mut b) = new_test_plumbing();
        let config = Configuration::default();
        let script = async move {
            let mut ex = Exchange::new(&mut b);
            let request: DeleteRequest = ex.receive_header().await.unwrap();
            let _ = ex.read_path(request.path_length.into()).await.unwrap();
            // a well-formed success, but for the wrong command
            let reply = MkdirStatus {
                status: Status::Ok,
                modification_time: 0,
            };
            ex.send(&reply.encode()).await.unwrap();
        };
        let (r1, ()) = tokio::join!(requester(&DeleteHandler, "/f".into(), a, &config), script);
        assert_eq!(r1.unwrap_err().kind(), Some(ErrorKind::Protocol));
    }
}
