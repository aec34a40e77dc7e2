//! Versioned binary save format for a single player record.
//!
//! Layout (big-endian):
//! ```text
//! magic u16 | version u16 | x u16 | z u16 | level u8 | body 7×i8 | colors 5×u8
//! gender u8 | design_complete u8 | run_energy u16
//! playtime (u16 at v1, u32 from v2)
//! skills 21×(experience u32, level u8)
//! varp_count u16, varp_count×u32
//! inventory_count u8, per inventory: kind u16, size u16, size×slot
//!     slot: id u16, and when id != 0: count u8 (255 => u32 count follows)
//! [v3+] afk_count u8, afk_count×u32, last_afk_zone u16
//! [v4+] chat modes u8 (public << 4 | private << 2 | trade)
//! [v6+] last_login u64
//! checksum u32 (CRC-32 of every preceding byte)
//! ```
//! Version 5 shares the version 4 layout.
//!
//! # Invariants
//! - `encode` always writes `CURRENT_VERSION`.
//! - `decode` validates length, magic, version and checksum before reading any
//!   body field.
//! - Varps, inventories and AFK zones are decoded but written out empty.

use crate::checksum::{Crc32, checksum};
use crate::cursor::{CursorError, ReadCursor, WriteCursor};
use keepsake_common::{ChatModes, Inventory, ItemStack, PlayerRecord, SKILL_COUNT, SkillState};
use tracing::warn;

/// Leading marker of every save image.
pub const SAVE_MAGIC: u16 = 0x2004;
/// Version written by `encode`; the newest version `decode` accepts.
pub const CURRENT_VERSION: u16 = 6;
/// Smallest image `decode` will look at.
pub const MIN_IMAGE_LEN: usize = 20;

const HEADER_LEN: usize = 4;
const CHECKSUM_LEN: usize = 4;
const EXTENDED_COUNT: u8 = 255;

/// Size of a current-version image with empty varp, inventory and AFK blocks.
pub const ENCODED_LEN: usize = HEADER_LEN
    + 2 + 2 + 1 // x, z, level
    + 7 + 5 + 1 + 1 // body, colors, gender, design_complete
    + 2 + 4 // run_energy, playtime
    + SKILL_COUNT * 5
    + 2 + 1 // varp count, inventory count
    + 1 + 2 // afk count, last afk zone
    + 1 + 8 // chat modes, last login
    + CHECKSUM_LEN;

/// Why an image was refused by `decode`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("image is {len} bytes, minimum is {min}", min = MIN_IMAGE_LEN)]
    TooShort { len: usize },
    #[error("bad magic {found:#06x}, expected {expected:#06x}", expected = SAVE_MAGIC)]
    BadMagic { found: u16 },
    #[error("unsupported version {found}, supported 1..={current}", current = CURRENT_VERSION)]
    UnsupportedVersion { found: u16 },
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("truncated body: {0}")]
    Truncated(#[from] CursorError),
}

/// Errors from `encode`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("encode buffer overflow: {0}")]
    Overflow(#[from] CursorError),
}

/// Serialized bytes of one player record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveImage(Vec<u8>);

impl SaveImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for SaveImage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Header facts of an image that passed the pre-parse checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub version: u16,
    pub len: usize,
    /// Trailing checksum as stored in the image.
    pub stored: u32,
    /// Checksum recomputed over every byte before the trailer.
    pub computed: u32,
}

/// Length, magic, version and checksum checks, without parsing the body.
pub fn read_header(bytes: &[u8]) -> Result<HeaderInfo, RejectReason> {
    let len = bytes.len();
    if len < MIN_IMAGE_LEN {
        return Err(RejectReason::TooShort { len });
    }

    let mut r = ReadCursor::new(bytes);
    let magic = r.read_u16()?;
    if magic != SAVE_MAGIC {
        return Err(RejectReason::BadMagic { found: magic });
    }
    let version = r.read_u16()?;
    if version == 0 || version > CURRENT_VERSION {
        return Err(RejectReason::UnsupportedVersion { found: version });
    }

    let body_end = len - CHECKSUM_LEN;
    let stored = ReadCursor::new(&bytes[body_end..]).read_u32()?;
    let mut crc = Crc32::new();
    crc.update(&bytes[..body_end]);
    let computed = crc.finalize();
    if stored != computed {
        return Err(RejectReason::ChecksumMismatch { stored, computed });
    }

    Ok(HeaderInfo {
        version,
        len,
        stored,
        computed,
    })
}

/// Decode an image of any supported version.
pub fn decode(bytes: &[u8]) -> Result<PlayerRecord, RejectReason> {
    let header = read_header(bytes)?;
    let version = header.version;
    let mut r = ReadCursor::new(&bytes[..header.len - CHECKSUM_LEN]);
    r.read_u16()?;
    r.read_u16()?;

    let x = r.read_u16()?;
    let z = r.read_u16()?;
    let level = r.read_u8()?;

    let mut body = [0i8; 7];
    for part in &mut body {
        *part = r.read_i8()?;
    }
    let mut colors = [0u8; 5];
    for color in &mut colors {
        *color = r.read_u8()?;
    }
    let gender = r.read_u8()?;
    let design_complete = r.read_u8()? != 0;
    let run_energy = r.read_u16()?;
    let playtime = if version >= 2 {
        r.read_u32()?
    } else {
        u32::from(r.read_u16()?)
    };

    let mut skills = [SkillState::default(); SKILL_COUNT];
    for skill in &mut skills {
        let experience = r.read_u32()?;
        let level = r.read_u8()?;
        *skill = SkillState { experience, level };
    }

    let varp_count = r.read_u16()?;
    let mut varps = Vec::with_capacity(usize::from(varp_count).min(r.remaining() / 4));
    for _ in 0..varp_count {
        varps.push(r.read_u32()?);
    }

    let inventory_count = r.read_u8()?;
    let mut inventories = Vec::with_capacity(usize::from(inventory_count));
    for _ in 0..inventory_count {
        inventories.push(read_inventory(&mut r)?);
    }

    let mut afk_zones = Vec::new();
    let mut last_afk_zone = 0;
    if version >= 3 {
        let count = r.read_u8()?;
        afk_zones.reserve(usize::from(count));
        for _ in 0..count {
            afk_zones.push(r.read_u32()?);
        }
        last_afk_zone = r.read_u16()?;
    }

    let chat = if version >= 4 {
        unpack_chat(r.read_u8()?)
    } else {
        ChatModes::default()
    };

    let last_login = if version >= 6 { r.read_u64()? } else { 0 };

    if r.remaining() > 0 {
        warn!(
            version,
            trailing = r.remaining(),
            "save image has unread bytes before its checksum"
        );
    }

    Ok(PlayerRecord {
        x,
        z,
        level,
        body,
        colors,
        gender,
        design_complete,
        run_energy,
        playtime,
        skills,
        varps,
        inventories,
        afk_zones,
        last_afk_zone,
        chat,
        last_login,
    })
}

fn read_inventory(r: &mut ReadCursor<'_>) -> Result<Inventory, CursorError> {
    let kind = r.read_u16()?;
    let size = r.read_u16()?;
    // Every slot takes at least two bytes; don't trust `size` for the allocation.
    let mut slots = Vec::with_capacity(usize::from(size).min(r.remaining() / 2));
    for _ in 0..size {
        let id = r.read_u16()?;
        if id == 0 {
            slots.push(None);
            continue;
        }
        let short = r.read_u8()?;
        let count = if short == EXTENDED_COUNT {
            r.read_u32()?
        } else {
            u32::from(short)
        };
        slots.push(Some(ItemStack { id, count }));
    }
    Ok(Inventory { kind, slots })
}

/// Encode `record` at `CURRENT_VERSION`.
pub fn encode(record: &PlayerRecord) -> Result<SaveImage, CodecError> {
    if record.has_decode_only_data() {
        warn!(
            varps = record.varps.len(),
            inventories = record.inventories.len(),
            afk_zones = record.afk_zones.len(),
            last_afk_zone = record.last_afk_zone,
            "varp, inventory and afk blocks are not persisted; writing them empty"
        );
    }

    let mut w = WriteCursor::with_capacity(ENCODED_LEN);
    w.write_u16(SAVE_MAGIC)?;
    w.write_u16(CURRENT_VERSION)?;

    w.write_u16(record.x)?;
    w.write_u16(record.z)?;
    w.write_u8(record.level)?;
    for &part in &record.body {
        w.write_i8(part)?;
    }
    for &color in &record.colors {
        w.write_u8(color)?;
    }
    w.write_u8(record.gender)?;
    w.write_u8(u8::from(record.design_complete))?;
    w.write_u16(record.run_energy)?;
    w.write_u32(record.playtime)?;

    for skill in &record.skills {
        w.write_u32(skill.experience)?;
        w.write_u8(skill.level)?;
    }

    w.write_u16(0)?; // varps
    w.write_u8(0)?; // inventories
    w.write_u8(0)?; // afk zones
    w.write_u16(0)?; // last afk zone

    if !chat_in_range(record.chat) {
        warn!(
            public = record.chat.public,
            private = record.chat.private,
            trade = record.chat.trade,
            "chat modes exceed their wire width; writing them masked"
        );
    }
    w.write_u8(pack_chat(record.chat))?;
    w.write_u64(record.last_login)?;

    let crc = checksum(w.written());
    w.write_u32(crc)?;
    Ok(SaveImage(w.into_bytes()))
}

const CHAT_PUBLIC_MASK: u8 = 0x0F;
const CHAT_PRIVATE_MASK: u8 = 0x03;
const CHAT_TRADE_MASK: u8 = 0x03;

fn chat_in_range(chat: ChatModes) -> bool {
    chat.public <= CHAT_PUBLIC_MASK
        && chat.private <= CHAT_PRIVATE_MASK
        && chat.trade <= CHAT_TRADE_MASK
}

fn pack_chat(chat: ChatModes) -> u8 {
    ((chat.public & CHAT_PUBLIC_MASK) << 4)
        | ((chat.private & CHAT_PRIVATE_MASK) << 2)
        | (chat.trade & CHAT_TRADE_MASK)
}

fn unpack_chat(packed: u8) -> ChatModes {
    ChatModes {
        public: (packed >> 4) & CHAT_PUBLIC_MASK,
        private: (packed >> 2) & CHAT_PRIVATE_MASK,
        trade: packed & CHAT_TRADE_MASK,
    }
}
