//! Paginated record transfer
//!
//! Lists that do not fit one report (LED colors, snap-click pairs, region
//! assignments, effect playlists, raw profile bytes) are moved as runs of
//! fixed-size records: each round-trip carries `floor(budget / size)`
//! records and the loop advances the start index by the batch actually
//! sent. A failing round-trip aborts the whole transfer; callers get the
//! full list or an error, never a prefix.

use keychron_transport::protocol::{analog, cmd, misc, rgb, REPORT_SIZE};
use keychron_transport::{CommandFrame, ResponseShape};
use tracing::debug;

use crate::client::KeychronClient;
use crate::error::KeyboardError;
use crate::misc::SnapClickPair;
use crate::rgb::{EffectSlot, Hsv};

/// A list addressable as `(start, count)` on the device
pub trait RecordKind {
    type Record: Clone;

    /// Wire size of one record
    const RECORD_SIZE: usize;

    /// Name for logging
    fn name(&self) -> &'static str;

    /// Request for `count` records starting at `start`
    fn read_frame(&self, start: usize, count: usize) -> Result<CommandFrame, KeyboardError>;

    /// Request writing `records` starting at `start`
    fn write_frame(
        &self,
        start: usize,
        records: &[Self::Record],
    ) -> Result<CommandFrame, KeyboardError>;

    fn decode(bytes: &[u8]) -> Self::Record;

    fn encode(record: &Self::Record, out: &mut Vec<u8>);

    /// Request bytes preceding the records in a write
    fn write_header_len(&self) -> usize;

    /// Response bytes available for records in a read
    fn read_budget(&self) -> usize {
        REPORT_SIZE - ResponseShape::GroupedWithStatus.header_len()
    }

    /// Request bytes available for records in a write
    fn write_budget(&self) -> usize {
        REPORT_SIZE.saturating_sub(self.write_header_len())
    }

    fn max_read_batch(&self) -> usize {
        self.read_budget() / Self::RECORD_SIZE
    }

    fn max_write_batch(&self) -> usize {
        self.write_budget() / Self::RECORD_SIZE
    }
}

pub(crate) fn index_u8(value: usize, what: &str) -> Result<u8, KeyboardError> {
    u8::try_from(value)
        .map_err(|_| KeyboardError::InvalidParameter(format!("{} {} out of range", what, value)))
}

/// `[cmd, sub, prefix.., start, count]`
fn list_frame(
    command: u8,
    sub: u8,
    prefix: &[u8],
    start: usize,
    count: usize,
) -> Result<CommandFrame, KeyboardError> {
    Ok(CommandFrame::group(command, sub)
        .args(prefix)
        .arg(index_u8(start, "start index")?)
        .arg(index_u8(count, "record count")?))
}

fn encode_all<K: RecordKind + ?Sized>(records: &[K::Record]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * K::RECORD_SIZE);
    for record in records {
        K::encode(record, &mut out);
    }
    out
}

/// Per-LED colors (`RGB/PER_KEY_GET_COLOR`, `RGB/PER_KEY_SET_COLOR`)
#[derive(Debug, Clone, Copy, Default)]
pub struct LedColors;

impl RecordKind for LedColors {
    type Record = Hsv;
    const RECORD_SIZE: usize = 3;

    fn name(&self) -> &'static str {
        "LED colors"
    }

    fn read_frame(&self, start: usize, count: usize) -> Result<CommandFrame, KeyboardError> {
        list_frame(cmd::RGB_GROUP, rgb::PER_KEY_GET_COLOR, &[], start, count)
    }

    fn write_frame(&self, start: usize, records: &[Hsv]) -> Result<CommandFrame, KeyboardError> {
        Ok(
            list_frame(cmd::RGB_GROUP, rgb::PER_KEY_SET_COLOR, &[], start, records.len())?
                .args(&encode_all::<Self>(records)),
        )
    }

    fn decode(bytes: &[u8]) -> Hsv {
        Hsv::new(bytes[0], bytes[1], bytes[2])
    }

    fn encode(record: &Hsv, out: &mut Vec<u8>) {
        out.extend_from_slice(&[record.hue, record.saturation, record.value]);
    }

    fn write_header_len(&self) -> usize {
        4
    }
}

/// Misc-group snap-click (SOCD) pairs (`MISC/SNAP_CLICK_GET`, `MISC/SNAP_CLICK_SET`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapClicks;

impl RecordKind for SnapClicks {
    type Record = SnapClickPair;
    const RECORD_SIZE: usize = 3;

    fn name(&self) -> &'static str {
        "snap click pairs"
    }

    fn read_frame(&self, start: usize, count: usize) -> Result<CommandFrame, KeyboardError> {
        list_frame(cmd::MISC_GROUP, misc::SNAP_CLICK_GET, &[], start, count)
    }

    fn write_frame(
        &self,
        start: usize,
        records: &[SnapClickPair],
    ) -> Result<CommandFrame, KeyboardError> {
        Ok(
            list_frame(cmd::MISC_GROUP, misc::SNAP_CLICK_SET, &[], start, records.len())?
                .args(&encode_all::<Self>(records)),
        )
    }

    fn decode(bytes: &[u8]) -> SnapClickPair {
        SnapClickPair {
            kind: bytes[0],
            key1: bytes[1],
            key2: bytes[2],
        }
    }

    fn encode(record: &SnapClickPair, out: &mut Vec<u8>) {
        out.extend_from_slice(&[record.kind, record.key1, record.key2]);
    }

    fn write_header_len(&self) -> usize {
        4
    }
}

/// LED to mixed-RGB region assignments (`RGB/MIXED_GET_REGIONS`, `RGB/MIXED_SET_REGIONS`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Regions;

impl RecordKind for Regions {
    type Record = u8;
    const RECORD_SIZE: usize = 1;

    fn name(&self) -> &'static str {
        "LED regions"
    }

    fn read_frame(&self, start: usize, count: usize) -> Result<CommandFrame, KeyboardError> {
        list_frame(cmd::RGB_GROUP, rgb::MIXED_GET_REGIONS, &[], start, count)
    }

    fn write_frame(&self, start: usize, records: &[u8]) -> Result<CommandFrame, KeyboardError> {
        Ok(
            list_frame(cmd::RGB_GROUP, rgb::MIXED_SET_REGIONS, &[], start, records.len())?
                .args(records),
        )
    }

    fn decode(bytes: &[u8]) -> u8 {
        bytes[0]
    }

    fn encode(record: &u8, out: &mut Vec<u8>) {
        out.push(*record);
    }

    fn write_header_len(&self) -> usize {
        4
    }
}

/// Effect playlist of one mixed-RGB region
/// (`RGB/MIXED_GET_EFFECT_LIST`, `RGB/MIXED_SET_EFFECT_LIST`)
#[derive(Debug, Clone, Copy)]
pub struct RegionEffects {
    pub region: u8,
}

impl RecordKind for RegionEffects {
    type Record = EffectSlot;
    const RECORD_SIZE: usize = EffectSlot::WIRE_SIZE;

    fn name(&self) -> &'static str {
        "region effects"
    }

    fn read_frame(&self, start: usize, count: usize) -> Result<CommandFrame, KeyboardError> {
        list_frame(
            cmd::RGB_GROUP,
            rgb::MIXED_GET_EFFECT_LIST,
            &[self.region],
            start,
            count,
        )
    }

    fn write_frame(
        &self,
        start: usize,
        records: &[EffectSlot],
    ) -> Result<CommandFrame, KeyboardError> {
        Ok(list_frame(
            cmd::RGB_GROUP,
            rgb::MIXED_SET_EFFECT_LIST,
            &[self.region],
            start,
            records.len(),
        )?
        .args(&encode_all::<Self>(records)))
    }

    fn decode(bytes: &[u8]) -> EffectSlot {
        EffectSlot::from_wire(bytes)
    }

    fn encode(record: &EffectSlot, out: &mut Vec<u8>) {
        out.extend_from_slice(&record.to_wire());
    }

    fn write_header_len(&self) -> usize {
        5
    }
}

/// Raw bytes of one analog profile (`ANALOG/GET_PROFILE_RAW`, read-only)
///
/// Request: `[profile, offset u16 LE, size]`.
#[derive(Debug, Clone, Copy)]
pub struct ProfileBytes {
    pub profile: u8,
}

impl RecordKind for ProfileBytes {
    type Record = u8;
    const RECORD_SIZE: usize = 1;

    fn name(&self) -> &'static str {
        "profile bytes"
    }

    fn read_frame(&self, start: usize, count: usize) -> Result<CommandFrame, KeyboardError> {
        let offset = u16::try_from(start).map_err(|_| {
            KeyboardError::InvalidParameter(format!("profile offset {} out of range", start))
        })?;
        Ok(CommandFrame::group(cmd::ANALOG_GROUP, analog::GET_PROFILE_RAW)
            .arg(self.profile)
            .arg_u16(offset)
            .arg(index_u8(count, "record count")?))
    }

    fn write_frame(&self, _start: usize, _records: &[u8]) -> Result<CommandFrame, KeyboardError> {
        Err(KeyboardError::InvalidParameter(
            "raw profile bytes are read-only".into(),
        ))
    }

    fn decode(bytes: &[u8]) -> u8 {
        bytes[0]
    }

    fn encode(record: &u8, out: &mut Vec<u8>) {
        out.push(*record);
    }

    fn write_header_len(&self) -> usize {
        REPORT_SIZE
    }
}

impl KeychronClient {
    /// Read `count` records starting at `start`
    pub async fn read_records<K: RecordKind>(
        &self,
        kind: &K,
        start: usize,
        count: usize,
    ) -> Result<Vec<K::Record>, KeyboardError> {
        let max_batch = kind.max_read_batch();
        if max_batch == 0 {
            return Err(KeyboardError::InvalidParameter(format!(
                "{} do not fit a report",
                kind.name()
            )));
        }

        // Frame every batch up front so an unaddressable range sends nothing
        let end = start + count;
        let frames = (start..end)
            .step_by(max_batch)
            .map(|index| {
                let batch = (end - index).min(max_batch);
                kind.read_frame(index, batch).map(|frame| (frame, batch))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(count);
        for (frame, batch) in &frames {
            let len = batch * K::RECORD_SIZE;
            let payload = self.execute(frame, len).await?;
            records.extend(payload[..len].chunks_exact(K::RECORD_SIZE).map(K::decode));
        }

        debug!(
            "Read {} {} from {} in {} round-trips",
            records.len(),
            kind.name(),
            start,
            count.div_ceil(max_batch)
        );
        Ok(records)
    }

    /// Write `records` starting at `start`
    pub async fn write_records<K: RecordKind>(
        &self,
        kind: &K,
        start: usize,
        records: &[K::Record],
    ) -> Result<(), KeyboardError> {
        let max_batch = kind.max_write_batch();
        if max_batch == 0 {
            return Err(KeyboardError::InvalidParameter(format!(
                "{} are not writable",
                kind.name()
            )));
        }

        let frames = records
            .chunks(max_batch)
            .enumerate()
            .map(|(i, chunk)| kind.write_frame(start + i * max_batch, chunk))
            .collect::<Result<Vec<_>, _>>()?;
        for frame in &frames {
            self.command(frame).await?;
        }

        debug!("Wrote {} {} from {}", records.len(), kind.name(), start);
        Ok(())
    }
}
