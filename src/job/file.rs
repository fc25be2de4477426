//! Job-file format: header parsing and the scanline byte source.
//!
//! A job file starts with a plain 12-byte header followed by a zlib stream
//! of fixed-width command-word blocks, one block per facet per lane.

use crate::error::{JobError, Result};

/// Size of the plain job-file header in bytes.
pub const JOB_HEADER_LEN: usize = 12;

/// Decoded job-file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobHeader {
    /// Lane-to-lane pitch in mm.
    pub lane_width: f32,
    /// Scanlines per lane.
    pub facets_per_lane: u32,
    /// Number of lanes across the substrate.
    pub lane_count: u32,
}

impl JobHeader {
    /// Parse and validate the 12-byte header.
    ///
    /// Layout: `f32 LE lane_width | u32 LE facets_per_lane | u32 LE lane_count`.
    ///
    /// # Errors
    ///
    /// Returns a [`JobError`] for a non-positive lane width or empty
    /// geometry; a bad header is fatal for the job before anything moves.
    pub fn parse(bytes: &[u8; JOB_HEADER_LEN]) -> Result<Self> {
        let header = Self {
            lane_width: f32::from_le_bytes(bytes[0..4].try_into().unwrap_or_default()),
            facets_per_lane: u32::from_le_bytes(bytes[4..8].try_into().unwrap_or_default()),
            lane_count: u32::from_le_bytes(bytes[8..12].try_into().unwrap_or_default()),
        };
        header.validate()?;
        Ok(header)
    }

    /// Check the header for degenerate values.
    pub fn validate(&self) -> Result<()> {
        if !self.lane_width.is_finite() || self.lane_width <= 0.0 {
            return Err(JobError::InvalidLaneWidth(self.lane_width).into());
        }
        if self.facets_per_lane == 0 || self.lane_count == 0 {
            return Err(JobError::EmptyGeometry {
                facets_per_lane: self.facets_per_lane,
                lane_count: self.lane_count,
            }
            .into());
        }
        Ok(())
    }

    /// Total scanlines in the job.
    pub fn total_lines(&self) -> u32 {
        self.facets_per_lane.saturating_mul(self.lane_count)
    }
}

/// Source of scanline bytes for one job.
///
/// The executor exclusively owns the source for the job's duration and pulls
/// exactly one scanline block per facet.
pub trait JobSource {
    /// The job header.
    fn header(&self) -> JobHeader;

    /// Fill `buf` with the next scanline's command bytes.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::TruncatedStream`] when the body ends early.
    fn read_line(&mut self, buf: &mut [u8]) -> Result<()>;
}

#[cfg(feature = "std")]
mod zlib {
    use std::fs::File;
    use std::io::Read;
    use std::path::Path;

    use flate2::read::ZlibDecoder;
    use log::debug;

    use crate::error::{Error, JobError, Result};

    use super::{JobHeader, JobSource, JOB_HEADER_LEN};

    /// Job file on disk: plain header, zlib-compressed scanline body.
    pub struct ZlibJobFile {
        header: JobHeader,
        body: ZlibDecoder<File>,
    }

    impl ZlibJobFile {
        /// Open a job file and parse its header.
        ///
        /// # Errors
        ///
        /// Returns an I/O error for an unreadable file and a [`JobError`]
        /// for a malformed header; both are fatal at job start.
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            let mut file = File::open(path.as_ref()).map_err(io_error)?;

            let mut raw = [0u8; JOB_HEADER_LEN];
            file.read_exact(&mut raw).map_err(io_error)?;
            let header = JobHeader::parse(&raw)?;
            debug!(
                "job header: lane width {} mm, {} facets x {} lanes",
                header.lane_width, header.facets_per_lane, header.lane_count
            );

            Ok(Self {
                header,
                body: ZlibDecoder::new(file),
            })
        }
    }

    impl JobSource for ZlibJobFile {
        fn header(&self) -> JobHeader {
            self.header
        }

        fn read_line(&mut self, buf: &mut [u8]) -> Result<()> {
            self.body.read_exact(buf).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::Job(JobError::TruncatedStream)
                } else {
                    io_error(e)
                }
            })
        }
    }

    fn io_error(e: std::io::Error) -> Error {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Job(JobError::IoError(msg))
    }
}

#[cfg(feature = "std")]
pub use zlib::ZlibJobFile;
