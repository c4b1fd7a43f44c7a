//! One-shot message sender.
//!
//! Fire and forget: no id handshake, no receive loop. Connect, send one
//! frame, drop the link.

use crate::{error::ClientError, transport};

/// Send a single message assembled from `words` (joined with single
/// spaces) and disconnect.
///
/// Unlike the interactive client, a server disconnect here is a failure:
/// the whole point of the call was that one delivery.
pub async fn send_once(host: &str, port: u16, words: &[String]) -> Result<(), ClientError> {
    let (_reader, mut writer) = transport::connect(host, port).await?;

    let payload = words.join(" ");
    writer.send_payload(payload.as_bytes()).await?;
    tracing::debug!("message sent");

    Ok(())
}
