//! Move command
// (c) 2026 Ross Younger

use async_trait::async_trait;
use tracing::debug;

use super::handler::{CommandHandler, HandlerContext, RequestContext};
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::header::{MoveRequest, MoveStatus};
use crate::protocol::path::{encode_move_payload, path_length, split_move_payload};
use crate::protocol::{Feature, Status};
use crate::store::Store;
use crate::transport::PacketTransport;

#[derive(Debug)]
pub(crate) struct MoveArgs {
    pub(crate) from: String,
    pub(crate) to: String,
}

pub(crate) struct MoveHandler;

#[async_trait]
impl CommandHandler for MoveHandler {
    type Args = MoveArgs;
    type Output = ();
    type Request = MoveRequest;
    type Response = MoveStatus;

    fn failure(status: Status) -> MoveStatus {
        MoveStatus { status }
    }

    async fn send_impl<'a, T: PacketTransport>(
        &self,
        inner: &mut RequestContext<'a, T>,
        args: MoveArgs,
    ) -> Result<()> {
        if !inner.compat.supports(Feature::Move) {
            return Err(Error::new(
                ErrorKind::UnsupportedByPeer,
                format!(
                    "move needs protocol {}, peer has {}",
                    Feature::Move.level(),
                    inner.compat
                ),
            ));
        }
        let request = MoveRequest {
            old_path_length: path_length(&args.from)?,
            new_path_length: path_length(&args.to)?,
        };
        let ex = &mut inner.exchange;
        ex.send_with_payload(&request, &encode_move_payload(&args.from, &args.to))
            .await?;
        let reply: MoveStatus = ex.receive_header().await?;
        if reply.status != Status::Ok {
            return Err(Error::new(
                ErrorKind::MissingFile,
                format!("move {} to {}: {}", args.from, args.to, reply.status),
            ));
        }
        Ok(())
    }

    async fn handle_impl<'a, T: PacketTransport, S: Store>(
        &self,
        inner: &mut HandlerContext<'a, T, S>,
        request: MoveRequest,
    ) -> Result<()> {
        let old_length = usize::from(request.old_path_length);
        let new_length = usize::from(request.new_path_length);
        let payload = inner.exchange.take(old_length + 1 + new_length).await?;
        let (from, to) = match split_move_payload(&payload, old_length, new_length) {
            Ok(paths) => paths,
            Err(e) => {
                inner.refuse::<Self>(Status::ErrorProtocol).await?;
                return Err(e);
            }
        };
        let status = match inner.store.rename(&from, &to).await {
            Ok(()) => Status::Ok,
            Err(e) => {
                debug!("move {from} to {to}: {e}");
                Status::from(&e)
            }
        };
        inner.exchange.send_header(&MoveStatus { status }).await
    }
}
