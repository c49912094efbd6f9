use crate::transport::{TargetMessage, Transport, TransportResponse, next_id};
use anyhow::{Result, anyhow};
use serde_json::{Value, json};

/// Parses the JSON message string carried by a `TargetMessage`.
pub(crate) fn serde_msg(msg: &TargetMessage) -> Result<Value> {
    let str_msg = msg.params["message"]
        .as_str()
        .ok_or_else(|| anyhow!("Invalid message format"))?;
    Ok(serde_json::from_str(str_msg)?)
}

/// Sends a message to a target and waits for the corresponding response.
pub(crate) async fn send_and_get_msg(
    transport: &Transport,
    msg_id: usize,
    session_id: &str,
    msg: String,
) -> Result<TargetMessage> {
    let recv_fut = transport.get_target_msg(msg_id);
    let send_fut = transport.send(json!({
        "id": next_id(),
        "method": "Target.sendMessageToTarget",
        "params": { "sessionId": session_id, "message": msg }
    }));

    // Polled in order, so the reply listener is queued ahead of the command.
    let (target_msg, _) = futures_util::try_join!(recv_fut, send_fut)?;

    match target_msg {
        TransportResponse::Target(res) => Ok(res),
        other => Err(anyhow!("Unexpected response: {:?}", other)),
    }
}

/// Runs `method` inside the target session and returns the decoded inner reply.
pub(crate) async fn call_target(
    transport: &Transport,
    session_id: &str,
    method: &str,
    params: Value,
) -> Result<Value> {
    let msg_id = next_id();
    let msg = json!({ "id": msg_id, "method": method, "params": params }).to_string();
    let res = send_and_get_msg(transport, msg_id, session_id, msg).await?;
    serde_msg(&res)
}
