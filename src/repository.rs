use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::limits::MAX_FRAME_LEN;
use crate::model::{Change, Event};
use crate::notify::NotifyHub;

/// Wholesale load/replace of a store of booking instances.
///
/// A successful `save` publishes a `Change` so other readers of the same
/// store can reload.
pub trait EventRepository: Send + Sync {
    fn load(&self) -> io::Result<Vec<Event>>;
    fn save(&self, events: &[Event]) -> io::Result<()>;
}

/// Encode a single event as `[len][bincode][crc32]`.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Read frames until EOF. A truncated or corrupt tail ends the snapshot.
fn decode_events(reader: &mut impl Read) -> io::Result<Vec<Event>> {
    let mut events = Vec::new();
    loop {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            tracing::warn!("snapshot frame of {len} bytes after {} events", events.len());
            break;
        }

        let mut payload = vec![0u8; len];
        let mut crc_buf = [0u8; 4];
        match reader
            .read_exact(&mut payload)
            .and_then(|()| reader.read_exact(&mut crc_buf))
        {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::warn!("snapshot truncated after {} events", events.len());
                break;
            }
            Err(e) => return Err(e),
        }

        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
            tracing::warn!("snapshot checksum mismatch after {} events", events.len());
            break;
        }
        match bincode::deserialize::<Event>(&payload) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("undecodable snapshot entry after {} events: {e}", events.len());
                break;
            }
        }
    }
    Ok(events)
}

/// Read the revision header. A missing or short file is revision 0.
fn read_revision(reader: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(u64::from_le_bytes(buf)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
        Err(e) => Err(e),
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Snapshot file `[u64 revision]` followed by framed events, replaced
/// atomically on every save.
///
/// The revision lives in the file, so every handle on the same store sees
/// the same sequence, across reopens.
pub struct FileRepository {
    path: PathBuf,
    key: String,
    notify: Arc<NotifyHub>,
}

impl FileRepository {
    /// Repository for store `key` at `<data_dir>/<key>.snap`.
    ///
    /// The key is also the notification channel, so it must already be a
    /// plain file stem: alphanumerics, `_` and `-`.
    pub fn open(data_dir: &Path, key: &str, notify: Arc<NotifyHub>) -> io::Result<Self> {
        if !is_valid_key(key) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid store key: {key:?}"),
            ));
        }
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(format!("{key}.snap")),
            key: key.to_string(),
            notify,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Revision of the snapshot currently on disk.
    pub fn revision(&self) -> io::Result<u64> {
        match File::open(&self.path) {
            Ok(f) => read_revision(&mut BufReader::new(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl EventRepository for FileRepository {
    /// A missing file is an empty store.
    fn load(&self) -> io::Result<Vec<Event>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        read_revision(&mut reader)?;
        decode_events(&mut reader)
    }

    /// Write to a temp file, fsync, then rename over the snapshot.
    /// The new revision is one past the one on disk.
    fn save(&self, events: &[Event]) -> io::Result<()> {
        let revision = self.revision()? + 1;
        let tmp_path = self.path.with_extension("snap.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            writer.write_all(&revision.to_le_bytes())?;
            for event in events {
                encode_event(&mut writer, event)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        self.notify.send(
            &self.key,
            &Change::Saved {
                store: self.key.clone(),
                revision,
                events: events.len(),
            },
        );
        Ok(())
    }
}

#[derive(Default)]
struct Snapshot {
    revision: u64,
    events: Vec<Event>,
}

/// In-process repository, for embedding and tests.
pub struct MemoryRepository {
    key: String,
    snapshot: Mutex<Snapshot>,
    notify: Arc<NotifyHub>,
}

impl MemoryRepository {
    pub fn new(key: &str, notify: Arc<NotifyHub>) -> Self {
        Self {
            key: key.to_string(),
            snapshot: Mutex::new(Snapshot::default()),
            notify,
        }
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Snapshot>> {
        self.snapshot
            .lock()
            .map_err(|_| io::Error::other("memory repository poisoned"))
    }
}

impl EventRepository for MemoryRepository {
    fn load(&self) -> io::Result<Vec<Event>> {
        Ok(self.lock()?.events.clone())
    }

    fn save(&self, events: &[Event]) -> io::Result<()> {
        let revision = {
            let mut snapshot = self.lock()?;
            snapshot.events = events.to_vec();
            snapshot.revision += 1;
            snapshot.revision
        };
        self.notify.send(
            &self.key,
            &Change::Saved {
                store: self.key.clone(),
                revision,
                events: events.len(),
            },
        );
        Ok(())
    }
}
