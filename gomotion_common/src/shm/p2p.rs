//! Point-to-point shared-memory message channel (§4.1).
//!
//! A channel is a `/dev/shm`-backed segment holding a small header plus a
//! ping-pong pair of payload slots. The writer is the sole owner of the
//! segment's `cmd`/`cfg` (or `stat`/`set`) sub-region; any number of readers
//! may attach read-only.
//!
//! ## Torn-read protocol
//!
//! Each slot carries `head`/`tail` markers (§4.1, §8 invariant 3): the
//! writer bumps `head`, copies the payload, then sets `tail = head`. A
//! reader snapshots `head`/`tail` around its copy of the payload; if they
//! differ, the write raced the read and the reader retries (falling back to
//! the previous ping-pong slot if retries are exhausted). The active slot
//! index is only published (via the header's `active` field) *after* the
//! new slot's `tail` has been committed, so an attentive reader normally
//! never observes a torn write on the slot it is currently looking at — the
//! guard exists for the slow-reader case where two full write cycles land
//! on the same slot while a read is still in flight.

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use memmap2::{MmapMut, MmapOptions};
use static_assertions::const_assert_eq;
use thiserror::Error;

/// Magic bytes identifying a valid gomotion P2P segment.
pub const GOMOTION_P2P_MAGIC: [u8; 8] = *b"GOMOP2P\0";

/// Directory P2P segments are created under.
pub const SHM_DIR: &str = "/dev/shm";

/// Module abbreviation identifying the source/destination of a P2P segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModuleAbbrev {
    /// Servo Loop instance `n` (§4.2). The instance index is carried
    /// alongside this tag in the segment name, not in the enum itself.
    Servo = 0,
    /// Trajectory Loop (§4.4).
    Traj = 1,
    /// Tool Loop (§4.5).
    Tool = 2,
    /// Task Loop (§4.6).
    Task = 3,
    /// The launcher/supervisor (§4.8), which only reads heartbeats.
    Launcher = 4,
}

impl ModuleAbbrev {
    /// Convert from raw `u8` value. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Servo),
            1 => Some(Self::Traj),
            2 => Some(Self::Tool),
            3 => Some(Self::Task),
            4 => Some(Self::Launcher),
            _ => None,
        }
    }
}

/// Errors raised by the P2P channel layer.
#[derive(Debug, Error)]
pub enum P2pError {
    #[error("segment '{name}' not found")]
    NotFound { name: String },
    #[error("segment '{name}' already exists")]
    AlreadyExists { name: String },
    #[error("segment '{name}' has mismatched version hash (layout changed)")]
    VersionMismatch { name: String },
    #[error("segment '{name}' magic bytes invalid")]
    BadMagic { name: String },
    #[error("torn read on segment '{name}' after {retries} retries")]
    TornRead { name: String, retries: u32 },
    #[error("segment '{name}' is stale (no heartbeat change for {cycles} reads)")]
    Stale { name: String, cycles: u32 },
    #[error("I/O error on segment '{name}': {source}")]
    Io { name: String, #[source] source: std::io::Error },
}

/// Compile-time version hash for payload-struct compatibility detection.
///
/// Computed from `size_of::<T>()`/`align_of::<T>()`; if the struct layout
/// changes, the hash changes and reader/writer refuse to connect. Does not
/// detect field reordering within the same total size/alignment — acceptable
/// because every payload type here is `#[repr(C)]` with explicit field order.
pub const fn struct_version_hash<T>() -> u32 {
    let size = core::mem::size_of::<T>() as u32;
    let align = core::mem::align_of::<T>() as u32;
    size.wrapping_mul(0x9E3779B9) ^ align.wrapping_mul(0x517CC1B7)
}

/// One ping-pong slot: `head`/`payload`/`tail`.
#[repr(C)]
struct Slot<T> {
    head: AtomicU64,
    payload: T,
    tail: AtomicU64,
}

/// Segment header, 64-byte cache-line aligned.
#[repr(C, align(64))]
struct Header {
    magic: [u8; 8],
    version_hash: u32,
    source_module: u8,
    dest_module: u8,
    /// Index (0/1) of the slot a reader should look at.
    active: AtomicU32,
    /// Monotonically increasing write counter, bumped on every commit.
    heartbeat: AtomicU64,
    /// Next serial number to stamp (writer-local bookkeeping mirrored here
    /// so multiple writer handles in the same process — none exist today,
    /// but the field costs nothing — stay consistent).
    next_serial: AtomicU64,
    _padding: [u8; 24],
}

const_assert_eq!(core::mem::align_of::<Header>(), 64);

#[repr(C)]
struct Segment<T> {
    header: Header,
    slots: [Slot<T>; 2],
}

fn segment_path(seg_name: &str) -> String {
    format!("{SHM_DIR}/gomotion_{seg_name}")
}

/// The write side of a P2P channel. Not thread-safe — exactly one writer
/// handle per segment, matching §5's "exactly one writer per sub-region".
pub struct TypedP2pWriter<T> {
    mmap: MmapMut,
    name: String,
    active_local: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Copy + Default> TypedP2pWriter<T> {
    /// Create (or truncate-recreate) the backing segment and map it.
    pub fn create(seg_name: &str, src: ModuleAbbrev, dst: ModuleAbbrev) -> Result<Self, P2pError> {
        let path = segment_path(seg_name);
        let size = core::mem::size_of::<Segment<T>>();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .mode(0o600)
            .open(&path)
            .map_err(|e| P2pError::Io { name: seg_name.to_string(), source: e })?;
        file.set_len(size as u64)
            .map_err(|e| P2pError::Io { name: seg_name.to_string(), source: e })?;

        let mut mmap = unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(&file)
                .map_err(|e| P2pError::Io { name: seg_name.to_string(), source: e })?
        };

        // SAFETY: `mmap` is exactly `size_of::<Segment<T>>()` bytes, freshly
        // truncated (and thus zero-filled), and aligned to a page boundary
        // which exceeds `Header`'s 64-byte alignment requirement.
        let seg = unsafe { &mut *(mmap.as_mut_ptr() as *mut Segment<T>) };
        seg.header.magic = GOMOTION_P2P_MAGIC;
        seg.header.version_hash = struct_version_hash::<T>();
        seg.header.source_module = src as u8;
        seg.header.dest_module = dst as u8;
        seg.header.active.store(0, Ordering::Release);
        seg.header.heartbeat.store(0, Ordering::Release);
        seg.header.next_serial.store(1, Ordering::Release);
        seg.slots[0].payload = T::default();
        seg.slots[1].payload = T::default();
        seg.slots[0].head.store(0, Ordering::Release);
        seg.slots[0].tail.store(0, Ordering::Release);
        seg.slots[1].head.store(0, Ordering::Release);
        seg.slots[1].tail.store(0, Ordering::Release);

        Ok(Self { mmap, name: seg_name.to_string(), active_local: 0, _marker: std::marker::PhantomData })
    }

    fn segment(&mut self) -> &mut Segment<T> {
        // SAFETY: constructed with the correct size/alignment in `create`.
        unsafe { &mut *(self.mmap.as_mut_ptr() as *mut Segment<T>) }
    }

    /// Next serial number to use for a newly-produced message (§4.1's
    /// serial-number protocol, §8 invariant 1).
    pub fn next_serial(&mut self) -> u64 {
        self.segment().header.next_serial.fetch_add(1, Ordering::AcqRel)
    }

    /// Write `payload` into the inactive slot, then publish it as active.
    pub fn write(&mut self, payload: T) {
        let next = 1 - self.active_local;
        let seg = self.segment();
        let seq = seg.header.heartbeat.load(Ordering::Relaxed) + 1;
        let slot = &mut seg.slots[next as usize];
        slot.head.store(seq, Ordering::Release);
        slot.payload = payload;
        slot.tail.store(seq, Ordering::Release);
        seg.header.active.store(next, Ordering::Release);
        seg.header.heartbeat.store(seq, Ordering::Release);
        self.active_local = next;
    }

    /// Segment name, for diagnostics/logging.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The read side of a P2P channel. Thread-safe to share read-only across
/// many readers by attaching independently (§5).
pub struct TypedP2pReader<T> {
    mmap: MmapMut,
    name: String,
    stale_threshold: u32,
    last_heartbeat: u64,
    stale_reads: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Copy + Default> TypedP2pReader<T> {
    /// Attach to an existing segment, validating magic bytes and layout hash.
    pub fn attach(seg_name: &str, stale_threshold: u32) -> Result<Self, P2pError> {
        let path = segment_path(seg_name);
        let size = core::mem::size_of::<Segment<T>>();
        let file = OpenOptions::new().read(true).write(true).open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                P2pError::NotFound { name: seg_name.to_string() }
            } else {
                P2pError::Io { name: seg_name.to_string(), source: e }
            }
        })?;

        let mmap = unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(&file)
                .map_err(|e| P2pError::Io { name: seg_name.to_string(), source: e })?
        };

        {
            let seg = unsafe { &*(mmap.as_ptr() as *const Segment<T>) };
            if seg.header.magic != GOMOTION_P2P_MAGIC {
                return Err(P2pError::BadMagic { name: seg_name.to_string() });
            }
            if seg.header.version_hash != struct_version_hash::<T>() {
                return Err(P2pError::VersionMismatch { name: seg_name.to_string() });
            }
        }

        Ok(Self {
            mmap,
            name: seg_name.to_string(),
            stale_threshold,
            last_heartbeat: 0,
            stale_reads: 0,
            _marker: std::marker::PhantomData,
        })
    }

    fn segment(&self) -> &Segment<T> {
        unsafe { &*(self.mmap.as_ptr() as *const Segment<T>) }
    }

    /// Read the latest committed payload, retrying on a torn snapshot.
    pub fn read(&mut self) -> Result<T, P2pError> {
        const MAX_RETRIES: u32 = 8;
        let seg = self.segment();
        for attempt in 0..MAX_RETRIES {
            let idx = seg.header.active.load(Ordering::Acquire) as usize;
            let slot = &seg.slots[idx];
            let head = slot.head.load(Ordering::Acquire);
            let payload = slot.payload;
            let tail = slot.tail.load(Ordering::Acquire);
            if head == tail {
                let hb = seg.header.heartbeat.load(Ordering::Acquire);
                if hb == self.last_heartbeat {
                    self.stale_reads += 1;
                } else {
                    self.stale_reads = 0;
                }
                self.last_heartbeat = hb;
                if self.stale_threshold > 0 && self.stale_reads > self.stale_threshold {
                    return Err(P2pError::Stale { name: self.name.clone(), cycles: self.stale_reads });
                }
                return Ok(payload);
            }
            let _ = attempt;
        }
        Err(P2pError::TornRead { name: self.name.clone(), retries: MAX_RETRIES })
    }

    /// `true` if the segment has committed a new message since the last
    /// successful `read()` (used to avoid redundant work, per the generic
    /// engine's `has_changed()` idiom).
    pub fn has_changed(&self) -> bool {
        self.segment().header.heartbeat.load(Ordering::Acquire) != self.last_heartbeat
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
