use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use runview_run::FlowRun;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, instrument, warn};

use crate::protocol::{ClientFrame, ServerFrame};
use crate::subscription::{SnapshotSender, subscription_pair};
use crate::{ChannelError, RunChannel, RunFlowRequest, RunSubscription};

/// Run channel over a websocket.
///
/// Each `open` uses its own connection, which is closed when the run
/// finishes or the subscription is disposed.
#[derive(Debug, Clone)]
pub struct WsRunChannel {
  url: String,
}

impl WsRunChannel {
  pub fn new(url: impl Into<String>) -> Self {
    Self { url: url.into() }
  }

  pub fn url(&self) -> &str {
    &self.url
  }
}

#[async_trait]
impl RunChannel for WsRunChannel {
  #[instrument(skip(self, initial_run), fields(url = %self.url, flow_version_id = %request.flow_version_id))]
  async fn open(
    &self,
    request: RunFlowRequest,
    initial_run: Option<FlowRun>,
  ) -> Result<RunSubscription, ChannelError> {
    let (stream, _) = connect_async(self.url.as_str())
      .await
      .map_err(|e| ChannelError::Connect {
        url: self.url.clone(),
        message: e.to_string(),
      })?;
    let (mut sink, mut stream) = stream.split();

    let frame = ClientFrame::RunFlow {
      request_id: uuid::Uuid::new_v4().to_string(),
      flow_version_id: request.flow_version_id.clone(),
      run: initial_run,
    };
    let text = serde_json::to_string(&frame)?;
    sink
      .send(Message::Text(text.into()))
      .await
      .map_err(|e| ChannelError::Send(e.to_string()))?;

    info!("run channel opened");

    let (sender, subscription) = subscription_pair();
    let flow_version_id = request.flow_version_id;

    tokio::spawn(async move {
      loop {
        tokio::select! {
          biased;
          _ = sender.disposed() => {
            debug!(%flow_version_id, "run channel disposed");
            let _ = sink.send(Message::Close(None)).await;
            break;
          }
          message = stream.next() => {
            match message {
              Some(Ok(Message::Text(text))) => {
                if !handle_text(text.as_str(), &sender, &flow_version_id) {
                  let _ = sink.send(Message::Close(None)).await;
                  break;
                }
              }
              Some(Ok(Message::Ping(payload))) => {
                let _ = sink.send(Message::Pong(payload)).await;
              }
              Some(Ok(Message::Close(_))) | None => {
                debug!(%flow_version_id, "run channel closed by server");
                break;
              }
              Some(Ok(_)) => {}
              Some(Err(e)) => {
                warn!(%flow_version_id, error = %e, "run channel transport error");
                break;
              }
            }
          }
        }
      }
    });

    Ok(subscription)
  }
}

/// Handle one text frame. Returns `false` when the stream should end.
fn handle_text(text: &str, sender: &SnapshotSender, flow_version_id: &str) -> bool {
  let frame: ServerFrame = match serde_json::from_str(text) {
    Ok(frame) => frame,
    Err(e) => {
      warn!(%flow_version_id, error = %e, "skipping undecodable run channel frame");
      return true;
    }
  };

  let is_final = frame.is_final();
  match frame {
    ServerFrame::Error { message } => {
      warn!(%flow_version_id, %message, "run channel reported an error");
    }
    frame => {
      if let Some(run) = frame.into_run() {
        debug!(%flow_version_id, run_id = %run.id, status = ?run.status, "run snapshot received");
        if !sender.send(run) {
          return false;
        }
      }
    }
  }

  !is_final
}
