//! Attachment slots on the final wizard step.
//!
//! Each slot carries a generation counter. Selecting a file bumps it and
//! hands out a [`ReadTicket`]; a read only lands in the slot while its ticket
//! is current, so a superseded read finishing late is discarded.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mime::Mime;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;

use super::WizardError;
use crate::domain::{AttachmentSlot, EncodedAttachment};

pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;
const READ_CHUNK: usize = 64 * 1024;

pub fn is_allowed_mime(candidate: &Mime) -> bool {
    [mime::IMAGE_PNG, mime::IMAGE_JPEG, mime::APPLICATION_PDF]
        .iter()
        .any(|allowed| allowed == candidate)
}

/// Metadata of a file chosen for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime: Mime,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, size: u64, mime: Mime) -> Self {
        Self {
            name: name.into(),
            size,
            mime,
        }
    }

    /// MIME type is guessed from the file name.
    pub fn guessed(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let mime = mime_guess::from_path(&name).first_or_octet_stream();
        Self::new(name, size, mime)
    }

    pub fn is_acceptable(&self) -> bool {
        self.size <= MAX_ATTACHMENT_BYTES && is_allowed_mime(&self.mime)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Reading { file: SelectedFile, progress: u8 },
    Ready { file: SelectedFile, encoded: EncodedAttachment },
    Failed { file: SelectedFile, message: String },
}

impl SlotState {
    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            SlotState::Empty => None,
            SlotState::Reading { file, .. }
            | SlotState::Ready { file, .. }
            | SlotState::Failed { file, .. } => Some(file),
        }
    }
}

/// Proof that a read was started for a particular selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket {
    pub slot: AttachmentSlot,
    generation: u64,
}

#[derive(Debug, Clone)]
struct SlotEntry {
    generation: u64,
    state: SlotState,
}

impl Default for SlotEntry {
    fn default() -> Self {
        Self {
            generation: 0,
            state: SlotState::Empty,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentSlots {
    medical: SlotEntry,
    sehaty: SlotEntry,
    college: SlotEntry,
}

impl AttachmentSlots {
    fn entry(&self, slot: AttachmentSlot) -> &SlotEntry {
        match slot {
            AttachmentSlot::Medical => &self.medical,
            AttachmentSlot::Sehaty => &self.sehaty,
            AttachmentSlot::College => &self.college,
        }
    }

    fn entry_mut(&mut self, slot: AttachmentSlot) -> &mut SlotEntry {
        match slot {
            AttachmentSlot::Medical => &mut self.medical,
            AttachmentSlot::Sehaty => &mut self.sehaty,
            AttachmentSlot::College => &mut self.college,
        }
    }

    pub fn state(&self, slot: AttachmentSlot) -> &SlotState {
        &self.entry(slot).state
    }

    pub fn encoded(&self, slot: AttachmentSlot) -> Option<&EncodedAttachment> {
        match self.state(slot) {
            SlotState::Ready { encoded, .. } => Some(encoded),
            _ => None,
        }
    }

    /// Start over for `slot`; any earlier ticket for it becomes stale.
    pub fn select(&mut self, slot: AttachmentSlot, file: SelectedFile) -> ReadTicket {
        let entry = self.entry_mut(slot);
        entry.generation += 1;
        entry.state = SlotState::Reading { file, progress: 0 };
        ReadTicket {
            slot,
            generation: entry.generation,
        }
    }

    pub fn is_current(&self, ticket: ReadTicket) -> bool {
        self.entry(ticket.slot).generation == ticket.generation
    }

    /// Returns `false` when the ticket is stale and nothing changed.
    pub fn report_progress(&mut self, ticket: ReadTicket, percent: u8) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        if let SlotState::Reading { progress, .. } = &mut self.entry_mut(ticket.slot).state {
            *progress = percent.min(100);
            return true;
        }
        false
    }

    pub fn complete(&mut self, ticket: ReadTicket, encoded: EncodedAttachment) -> bool {
        self.settle(ticket, |file| SlotState::Ready { file, encoded })
    }

    pub fn fail(&mut self, ticket: ReadTicket, message: impl Into<String>) -> bool {
        let message = message.into();
        self.settle(ticket, |file| SlotState::Failed { file, message })
    }

    /// The file grew past the limit while being read; `read` replaces the
    /// size taken at selection.
    pub fn fail_oversized(&mut self, ticket: ReadTicket, read: u64) -> bool {
        self.settle(ticket, |mut file| {
            file.size = file.size.max(read);
            SlotState::Failed {
                file,
                message: "file exceeds the 10 MiB limit".to_string(),
            }
        })
    }

    fn settle(&mut self, ticket: ReadTicket, next: impl FnOnce(SelectedFile) -> SlotState) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(slot = ticket.slot.label(), "discarding superseded attachment read");
            return false;
        }
        let entry = self.entry_mut(ticket.slot);
        match std::mem::replace(&mut entry.state, SlotState::Empty) {
            SlotState::Reading { file, .. } => {
                entry.state = next(file);
                true
            }
            other => {
                entry.state = other;
                false
            }
        }
    }

    pub fn clear(&mut self, slot: AttachmentSlot) {
        let entry = self.entry_mut(slot);
        entry.generation += 1;
        entry.state = SlotState::Empty;
    }

    /// Empty every slot. Generations keep counting so in-flight reads from
    /// before the reset are ignored.
    pub fn reset(&mut self) {
        for slot in AttachmentSlot::ALL {
            self.clear(*slot);
        }
    }
}

pub(crate) fn lock_slots(slots: &Mutex<AttachmentSlots>) -> MutexGuard<'_, AttachmentSlots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reads files into slots on background tasks.
#[derive(Debug, Clone)]
pub struct AttachmentUploader {
    slots: Arc<Mutex<AttachmentSlots>>,
}

impl AttachmentUploader {
    pub fn new(slots: Arc<Mutex<AttachmentSlots>>) -> Self {
        Self { slots }
    }

    /// Select `path` for `slot` and read it in the background.
    ///
    /// Files that are too large or of an unsupported type are recorded but
    /// not read; `None` is returned for them. The task resolves to `true`
    /// when its result landed in the slot.
    pub async fn spawn_read(
        &self,
        slot: AttachmentSlot,
        path: impl AsRef<Path>,
    ) -> Result<Option<JoinHandle<bool>>, WizardError> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| WizardError::Attachment {
                path: path.clone(),
                source,
            })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = SelectedFile::guessed(name, metadata.len());
        let acceptable = file.is_acceptable();

        let ticket = lock_slots(&self.slots).select(slot, file.clone());
        if !acceptable {
            lock_slots(&self.slots).fail(ticket, "file rejected before reading");
            return Ok(None);
        }

        let slots = Arc::clone(&self.slots);
        Ok(Some(tokio::spawn(read_into_slot(slots, ticket, path, file))))
    }
}

pub(super) async fn read_into_slot(
    slots: Arc<Mutex<AttachmentSlots>>,
    ticket: ReadTicket,
    path: PathBuf,
    file: SelectedFile,
) -> bool {
    match read_chunked(&slots, ticket, &path, file.size).await {
        Ok(ChunkedRead::Complete(bytes)) => {
            let encoded = EncodedAttachment {
                name: file.name.clone(),
                mime_type: file.mime.essence_str().to_string(),
                data: STANDARD.encode(bytes),
            };
            lock_slots(&slots).complete(ticket, encoded)
        }
        Ok(ChunkedRead::Superseded) => false,
        Ok(ChunkedRead::Oversized(read)) => {
            tracing::warn!(slot = ticket.slot.label(), read, "attachment grew past the size limit");
            lock_slots(&slots).fail_oversized(ticket, read)
        }
        Err(err) => {
            tracing::warn!(slot = ticket.slot.label(), error = %err, "attachment read failed");
            lock_slots(&slots).fail(ticket, err.to_string())
        }
    }
}

enum ChunkedRead {
    Complete(Vec<u8>),
    Superseded,
    /// Reading stopped once this many bytes exceeded the limit.
    Oversized(u64),
}

async fn read_chunked(
    slots: &Mutex<AttachmentSlots>,
    ticket: ReadTicket,
    path: &Path,
    expected: u64,
) -> std::io::Result<ChunkedRead> {
    let mut source = tokio::fs::File::open(path).await?;
    let mut bytes = Vec::with_capacity(usize::try_from(expected).unwrap_or(0));
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let read = source.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        if bytes.len() as u64 > MAX_ATTACHMENT_BYTES {
            return Ok(ChunkedRead::Oversized(bytes.len() as u64));
        }

        let percent = if expected == 0 {
            100
        } else {
            ((bytes.len() as u64).saturating_mul(100) / expected).min(100) as u8
        };
        if !lock_slots(slots).report_progress(ticket, percent) {
            return Ok(ChunkedRead::Superseded);
        }
    }

    if !lock_slots(slots).report_progress(ticket, 100) {
        return Ok(ChunkedRead::Superseded);
    }
    Ok(ChunkedRead::Complete(bytes))
}
