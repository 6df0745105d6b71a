use crate::error::SessionError;
use crate::media::{CaptureError, CapturedStream};
use crate::membership::JoinReply;
use crate::session::SessionSnapshot;
use tokio::sync::oneshot;
use watchparty_core::{
    CaptureKind, CapturedInput, ChatMessage, MediaStream, PeerId, Room, RoomId,
    StreamDimensions,
};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Requests into the session loop, from handles and from the loop's own
/// background tasks.
pub(crate) enum SessionCommand {
    CreateRoom {
        username: String,
        password: String,
        reply: Reply<Room>,
    },
    JoinRoom {
        room_id: RoomId,
        username: String,
        password: String,
        reply: JoinReply,
    },
    DestroyRoom {
        reply: Reply<()>,
    },
    LeaveRoom {
        reply: Reply<()>,
    },
    SendChat {
        text: String,
        reply: Reply<ChatMessage>,
    },
    RequestControl {
        peer: PeerId,
        reply: Reply<bool>,
    },
    GrantControl {
        peer: PeerId,
        reply: Reply<Option<StreamDimensions>>,
    },
    RevokeControl {
        peer: PeerId,
        reply: Reply<bool>,
    },
    DenyControl {
        peer: PeerId,
        reply: Reply<bool>,
    },
    ForwardInput {
        input: CapturedInput,
        reply: Reply<usize>,
    },
    StartCapture {
        kind: CaptureKind,
        reply: Reply<MediaStream>,
    },
    StopCapture {
        kind: CaptureKind,
        reply: Reply<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },

    /// A capture started by `StartCapture` has finished off-loop.
    CaptureFinished {
        kind: CaptureKind,
        result: Result<CapturedStream, CaptureError>,
        reply: Reply<MediaStream>,
    },
    /// The OS ended capture `generation` of `kind`.
    CaptureEnded {
        kind: CaptureKind,
        generation: u64,
    },
}
