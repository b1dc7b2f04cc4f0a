//! Media probe reports: cached ffprobe-style metadata per remote file.

use super::ReportId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Denormalized media metadata for one remote file, keyed by path and size.
///
/// The raw probe JSON is kept verbatim in `data`; the commonly queried
/// fields are lifted into columns when the report is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetaReport {
    id: ReportId,
    remote_path: String,
    size: Option<u64>,
    data: Value,
    video_codec: Option<String>,
    video_codec_long: Option<String>,
    video_bitrate: Option<i64>,
    audio_codec: Option<String>,
    audio_codec_long: Option<String>,
    audio_bitrate: Option<i64>,
    bitrate: Option<i64>,
    duration: Option<f64>,
    resolution_w: Option<i64>,
    resolution_h: Option<i64>,
    pix_fmt: Option<String>,
    created_at_by_meta: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MediaMetaReport {
    /// Builds a report from raw probe output, denormalizing the stream and
    /// container fields used for search and display.
    #[must_use]
    pub fn from_probe(remote_path: impl Into<String>, data: Value, clock: &(impl Clock + ?Sized)) -> Self {
        let video = stream_of_type(&data, "video");
        let audio = stream_of_type(&data, "audio");
        let format = data.get("format");

        let size = format
            .and_then(|format| int_field(format, "size"))
            .and_then(|size| u64::try_from(size).ok());

        Self {
            id: ReportId::new(),
            remote_path: remote_path.into(),
            size,
            video_codec: str_field(video, "codec_name"),
            video_codec_long: str_field(video, "codec_long_name"),
            video_bitrate: video.and_then(|stream| int_field(stream, "bit_rate")),
            audio_codec: str_field(audio, "codec_name"),
            audio_codec_long: str_field(audio, "codec_long_name"),
            audio_bitrate: audio.and_then(|stream| int_field(stream, "bit_rate")),
            bitrate: format.and_then(|format| int_field(format, "bit_rate")),
            duration: format.and_then(|format| float_field(format, "duration")),
            resolution_w: video.and_then(|stream| int_field(stream, "width")),
            resolution_h: video.and_then(|stream| int_field(stream, "height")),
            pix_fmt: str_field(video, "pix_fmt"),
            created_at_by_meta: format
                .and_then(|format| format.get("tags"))
                .and_then(|tags| tags.get("creation_time"))
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse::<DateTime<Utc>>().ok()),
            created_at: clock.utc(),
            data,
        }
    }

    /// Returns the report identifier.
    #[must_use]
    pub const fn id(&self) -> ReportId {
        self.id
    }

    /// Returns the probed file's remote path.
    #[must_use]
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// Returns the probed file's size in bytes, when the probe reported one.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }

    /// Returns the raw probe JSON.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the video codec short name.
    #[must_use]
    pub fn video_codec(&self) -> Option<&str> {
        self.video_codec.as_deref()
    }

    /// Returns the audio codec short name.
    #[must_use]
    pub fn audio_codec(&self) -> Option<&str> {
        self.audio_codec.as_deref()
    }

    /// Returns the container duration in seconds.
    #[must_use]
    pub const fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Returns the container bitrate.
    #[must_use]
    pub const fn bitrate(&self) -> Option<i64> {
        self.bitrate
    }

    /// Returns the video frame dimensions as `(width, height)`.
    #[must_use]
    pub const fn resolution(&self) -> (Option<i64>, Option<i64>) {
        (self.resolution_w, self.resolution_h)
    }

    /// Returns the pixel format.
    #[must_use]
    pub fn pix_fmt(&self) -> Option<&str> {
        self.pix_fmt.as_deref()
    }

    /// Returns the creation time recorded in the container metadata tags.
    #[must_use]
    pub const fn created_at_by_meta(&self) -> Option<DateTime<Utc>> {
        self.created_at_by_meta
    }

    /// Returns the report's creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Finds the first stream with the given `codec_type` in probe output.
fn stream_of_type<'data>(data: &'data Value, codec_type: &str) -> Option<&'data Value> {
    data.get("streams")?
        .as_array()?
        .iter()
        .find(|stream| stream.get("codec_type").and_then(Value::as_str) == Some(codec_type))
}

fn str_field(value: Option<&Value>, key: &str) -> Option<String> {
    value?
        .get(key)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// Reads an integer field that probe tools emit either as a number or as a
/// decimal string.
fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.parse().ok(),
        _ => None,
    }
}

/// Reads a float field that probe tools emit either as a number or string.
fn float_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.parse().ok(),
        _ => None,
    }
}
