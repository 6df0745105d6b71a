use crate::error::SessionError;
use crate::membership::JoinedRoom;
use crate::session::{SessionCommand, SessionSnapshot};
use tokio::sync::{mpsc, oneshot};
use watchparty_core::{
    CaptureKind, CapturedInput, ChatMessage, MediaStream, PeerId, Room, RoomId,
    StreamDimensions,
};

/// Cloneable front door to a running session.
///
/// Every method is a round trip through the session loop, so calls from
/// different clones are applied one at a time in arrival order.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, SessionError>>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)?
    }

    /// Host a new room. The transport binds to the generated room id.
    pub async fn create_room(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Room, SessionError> {
        let (username, password) = (username.into(), password.into());
        self.request(|reply| SessionCommand::CreateRoom {
            username,
            password,
            reply,
        })
        .await
    }

    /// Dial the host of `room_id` and wait for its verdict.
    pub async fn join_room(
        &self,
        room_id: RoomId,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<JoinedRoom, SessionError> {
        let (username, password) = (username.into(), password.into());
        self.request(|reply| SessionCommand::JoinRoom {
            room_id,
            username,
            password,
            reply,
        })
        .await
    }

    pub async fn destroy_room(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::DestroyRoom { reply })
            .await
    }

    pub async fn leave_room(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::LeaveRoom { reply }).await
    }

    pub async fn send_chat(&self, text: impl Into<String>) -> Result<ChatMessage, SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendChat { text, reply })
            .await
    }

    /// `Ok(false)` when there is no connection to `peer`.
    pub async fn request_control(&self, peer: &PeerId) -> Result<bool, SessionError> {
        let peer = peer.clone();
        self.request(|reply| SessionCommand::RequestControl { peer, reply })
            .await
    }

    /// Returns the announced stream size, or `None` when there is no
    /// connection to `peer`.
    pub async fn grant_control(
        &self,
        peer: &PeerId,
    ) -> Result<Option<StreamDimensions>, SessionError> {
        let peer = peer.clone();
        self.request(|reply| SessionCommand::GrantControl { peer, reply })
            .await
    }

    pub async fn revoke_control(&self, peer: &PeerId) -> Result<bool, SessionError> {
        let peer = peer.clone();
        self.request(|reply| SessionCommand::RevokeControl { peer, reply })
            .await
    }

    pub async fn deny_control(&self, peer: &PeerId) -> Result<bool, SessionError> {
        let peer = peer.clone();
        self.request(|reply| SessionCommand::DenyControl { peer, reply })
            .await
    }

    /// Send captured input to every peer that granted us control. Returns
    /// how many it reached.
    pub async fn forward_input(&self, input: CapturedInput) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::ForwardInput { input, reply })
            .await
    }

    pub async fn start_screen_share(&self) -> Result<MediaStream, SessionError> {
        self.request(|reply| SessionCommand::StartCapture {
            kind: CaptureKind::Display,
            reply,
        })
        .await
    }

    pub async fn stop_screen_share(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::StopCapture {
            kind: CaptureKind::Display,
            reply,
        })
        .await
    }

    pub async fn enable_voice(&self) -> Result<MediaStream, SessionError> {
        self.request(|reply| SessionCommand::StartCapture {
            kind: CaptureKind::Microphone,
            reply,
        })
        .await
    }

    pub async fn disable_voice(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::StopCapture {
            kind: CaptureKind::Microphone,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Snapshot { reply })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    /// Leave or destroy whatever room is active and stop the loop.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Shutdown { reply })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
