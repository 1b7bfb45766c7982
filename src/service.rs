//! Request/response boundary between the UI and the note store.
//!
//! The UI never shares memory with the store: it sends a [`Request`] and
//! receives exactly one [`Response`]. Requests are processed concurrently;
//! two requests touching the same note are not ordered against each other.

use std::io;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::commands::{self, AppState};
use crate::error::{Result, StoreError};
use crate::models::{NoteExt, NoteKey, NoteRecord, TrashEntry};

/// Queue depth between callers and the dispatcher.
const REQUEST_QUEUE: usize = 64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "cmd", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    GetNotes,
    ReadNote {
        title: String,
        ext: NoteExt,
    },
    WriteNote {
        title: String,
        ext: NoteExt,
        content: String,
    },
    CreateNote,
    CreateUntitledNote,
    DeleteNote {
        title: String,
        ext: NoteExt,
    },
    RenameNote {
        old_title: String,
        new_title: String,
        ext: NoteExt,
    },
    TrashNote {
        title: String,
        ext: NoteExt,
    },
    GetTrash,
    RestoreNote {
        title: String,
        ext: NoteExt,
    },
    EmptyTrash,
    #[serde(rename = "exportCurrentViewToPDF", alias = "exportPDF")]
    ExportPdf,
}

/// Answer to a [`Request`], encoded the way the UI expects it.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Response {
    Notes(Vec<NoteRecord>),
    Trash(Vec<TrashEntry>),
    Content(String),
    Created(NoteKey),
    Flag(bool),
    Failed { error: String },
    Ack,
}

impl Response {
    fn from_created(created: Option<NoteKey>) -> Self {
        created.map_or(Response::Flag(false), Response::Created)
    }
}

/// Runs one request to completion.
pub async fn dispatch(state: &AppState, request: Request) -> Response {
    debug!("Handling {:?}", request);
    let fail = |error: String| Response::Failed { error };

    match request {
        Request::GetNotes => commands::get_notes(state)
            .await
            .map_or_else(fail, Response::Notes),
        Request::ReadNote { title, ext } => commands::read_note(state, title, ext)
            .await
            .map_or_else(fail, Response::Content),
        Request::WriteNote {
            title,
            ext,
            content,
        } => commands::write_note(state, title, ext, content)
            .await
            .map_or_else(fail, |()| Response::Ack),
        Request::CreateNote => Response::from_created(commands::create_note(state).await),
        Request::CreateUntitledNote => {
            Response::from_created(commands::create_untitled_note(state).await)
        }
        Request::DeleteNote { title, ext } => {
            Response::Flag(commands::delete_note(state, title, ext).await)
        }
        Request::RenameNote {
            old_title,
            new_title,
            ext,
        } => Response::Flag(commands::rename_note(state, old_title, new_title, ext).await),
        Request::TrashNote { title, ext } => {
            Response::Flag(commands::trash_note(state, title, ext).await)
        }
        Request::GetTrash => commands::get_trash(state)
            .await
            .map_or_else(fail, Response::Trash),
        Request::RestoreNote { title, ext } => {
            Response::Flag(commands::restore_note(state, title, ext).await)
        }
        Request::EmptyTrash => Response::Flag(commands::empty_trash(state).await),
        Request::ExportPdf => Response::Flag(commands::export_pdf(state).await),
    }
}

struct Envelope {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// Sending side of the boundary. Cheap to clone.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ServiceHandle {
    /// Sends a request and waits for its response.
    pub async fn call(&self, request: Request) -> Result<Response> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| StoreError::Task("note service has stopped".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::Task("note service dropped the request".to_string()))
    }
}

/// Starts the dispatcher. It stops once every [`ServiceHandle`] is dropped.
pub fn spawn_service(state: AppState) -> (ServiceHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(REQUEST_QUEUE);

    let task = tokio::spawn(async move {
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let state = state.clone();
            tokio::spawn(async move {
                let response = dispatch(&state, request).await;
                if reply.send(response).is_err() {
                    debug!("Caller went away before the response was ready");
                }
            });
        }
        info!("Note service stopped");
    });

    (ServiceHandle { tx }, task)
}

/// One-shot trash purge at launch. Failure is logged and otherwise ignored.
pub fn spawn_startup_purge(state: AppState, retention_days: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        if commands::purge_expired_trash(&state, retention_days)
            .await
            .is_none()
        {
            error!("Startup trash purge failed");
        }
    })
}

/// Serves requests read as JSON lines, `{"id": .., "cmd": .., ...}`, and
/// writes one `{"id": .., "result": ..}` line per request as each completes.
pub async fn serve_json_lines<R, W>(handle: ServiceHandle, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = out_rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), io::Error>(())
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let handle = handle.clone();
        let out = out_tx.clone();
        tokio::spawn(async move {
            let answer = answer_line(&handle, &line).await;
            if out.send(answer).is_err() {
                warn!("Response writer closed");
            }
        });
    }
    drop(out_tx);

    writer_task.await.map_err(io::Error::other)?
}

async fn answer_line(handle: &ServiceHandle, line: &str) -> String {
    let (id, result) = match parse_line(line) {
        Ok((id, request)) => match handle.call(request).await {
            Ok(response) => (id, serde_json::to_value(response)),
            Err(err) => (id, Ok(serde_json::json!({ "error": err.to_string() }))),
        },
        Err((id, message)) => (id, Ok(serde_json::json!({ "error": message }))),
    };

    let result = result.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }));
    serde_json::json!({ "id": id, "result": result }).to_string()
}

fn parse_line(
    line: &str,
) -> std::result::Result<(serde_json::Value, Request), (serde_json::Value, String)> {
    let mut value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| (serde_json::Value::Null, e.to_string()))?;
    let id = value
        .as_object_mut()
        .and_then(|obj| obj.remove("id"))
        .unwrap_or(serde_json::Value::Null);
    match serde_json::from_value(value) {
        Ok(request) => Ok((id, request)),
        Err(e) => Err((id, format!("Invalid request: {}", e))),
    }
}
