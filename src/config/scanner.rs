//! Scan-engine geometry and timing configuration.

use serde::Deserialize;

/// Scan-engine parameters shared by the executor and the line encoder.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Polygon mirror speed in rpm.
    #[serde(default = "default_rpm")]
    pub rpm: u32,

    /// Command-prefix bytes ahead of each data word on the scan-engine link.
    #[serde(default = "default_command_bytes")]
    pub command_bytes: u8,

    /// Data-word size in bytes.
    #[serde(default = "default_word_bytes")]
    pub word_bytes: u8,

    /// Command words per scanline.
    #[serde(default = "default_words_per_line")]
    pub words_per_line: u32,

    /// Mirror facets per revolution.
    #[serde(default = "default_facets")]
    pub facets: u8,

    /// Start position relative to home; the X offset keeps the scan area
    /// clear of the home switch.
    #[serde(default = "default_start_offset")]
    pub start_offset: [f32; 3],
}

fn default_rpm() -> u32 {
    2000
}

fn default_command_bytes() -> u8 {
    1
}

fn default_word_bytes() -> u8 {
    8
}

fn default_words_per_line() -> u32 {
    63
}

fn default_facets() -> u8 {
    4
}

fn default_start_offset() -> [f32; 3] {
    [70.0, 5.0, 0.0]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            rpm: default_rpm(),
            command_bytes: default_command_bytes(),
            word_bytes: default_word_bytes(),
            words_per_line: default_words_per_line(),
            facets: default_facets(),
            start_offset: default_start_offset(),
        }
    }
}

impl ScannerConfig {
    /// Bytes in one command word (prefix + data word).
    #[inline]
    pub fn bytes_per_word(&self) -> usize {
        self.command_bytes as usize + self.word_bytes as usize
    }

    /// Bytes in one scanline block.
    #[inline]
    pub fn line_bytes(&self) -> usize {
        self.words_per_line as usize * self.bytes_per_word()
    }

    /// Facets between progress checkpoints.
    ///
    /// `floor(rpm / exposures)`, divided again by the facet count when
    /// single-facet mode exposes only every 4th facet. Never below 1 so the
    /// modulo checkpoint test stays well-defined.
    pub fn checkpoint_interval(&self, exposures_per_line: u16, single_facet: bool) -> u32 {
        let mut interval = self.rpm / u32::from(exposures_per_line.max(1));
        if single_facet {
            interval /= u32::from(self.facets.max(1));
        }
        interval.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_interval() {
        let cfg = ScannerConfig {
            rpm: 4000,
            ..ScannerConfig::default()
        };
        assert_eq!(cfg.checkpoint_interval(2, false), 2000);
        assert_eq!(cfg.checkpoint_interval(2, true), 500);
        assert_eq!(cfg.checkpoint_interval(1, true), 1000);
        // never zero, even for absurd exposure counts
        assert_eq!(cfg.checkpoint_interval(9000, true), 1);
    }

    #[test]
    fn test_line_geometry() {
        let cfg = ScannerConfig::default();
        assert_eq!(cfg.bytes_per_word(), 9);
        assert_eq!(cfg.line_bytes(), 63 * 9);
    }
}
