use crate::util::io::{is_fastq_like_path, is_gzip_path};
use anyhow::{Context, Result};
use derive_getters::Getters;
use flate2::bufread::MultiGzDecoder;
use itertools::Itertools;
use seq_io::{
    fasta::{Reader as FastaReader, RefRecord as FastaRefRecord},
    fastq::{Reader as FastqReader, RefRecord as FastqRefRecord},
};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// 128 KB default buffer size, same as pigz.
pub const GZ_BUFSIZE: usize = 64 * (1 << 10) * 2;

/// Enumeration of supported input file formats
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    FASTQ,
    FASTA,
}

impl Format {
    /// Guesses the format from the file extension, defaulting to FASTA.
    pub fn from_path<P: AsRef<Path>>(path: &P) -> Self {
        if is_fastq_like_path(path) {
            Format::FASTQ
        } else {
            Format::FASTA
        }
    }
}

#[derive(Clone, Debug, Getters)]
/// Common record struct that supports both FASTA and FASTQ
pub struct FastxOwnedRecord {
    pub head: Vec<u8>,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

impl FastxOwnedRecord {
    pub fn from_fastq(record: &FastqRefRecord) -> Self {
        let owned_record = record.to_owned_record();
        Self {
            head: owned_record.head,
            seq: owned_record.seq,
            qual: Some(owned_record.qual),
        }
    }

    pub fn from_fasta(record: &FastaRefRecord) -> Self {
        let owned_record = record.to_owned_record();
        Self {
            head: owned_record.head,
            seq: owned_record.seq,
            qual: None,
        }
    }

    pub fn seq_upper_case(&self) -> Vec<u8> {
        self.seq.iter().map(u8::to_ascii_uppercase).collect_vec()
    }

    /// The record name: the header up to the first whitespace.
    pub fn name(&self) -> Result<String> {
        header_to_name(&self.head)
    }
}

/// Converts the FASTA/FASTQ header (which may contain whitespaces) to a record name.
pub fn header_to_name(header: &[u8]) -> Result<String> {
    let header: std::borrow::Cow<str> = String::from_utf8_lossy(header);
    header
        .split_whitespace()
        .next()
        .map(std::string::ToString::to_string)
        .context("empty read name")
}

pub struct FastaToFastxIterator(FastaReader<Box<dyn Read + Send>>);

impl Iterator for FastaToFastxIterator {
    type Item = Result<FastxOwnedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|record| {
            record
                .map(|record| FastxOwnedRecord::from_fasta(&record))
                .context("Error reading FASTA record")
        })
    }
}

pub struct FastqToFastxIterator(FastqReader<Box<dyn Read + Send>>);

impl Iterator for FastqToFastxIterator {
    type Item = Result<FastxOwnedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|record| {
            record
                .map(|record| FastxOwnedRecord::from_fastq(&record))
                .context("Error reading FASTQ record")
        })
    }
}

/// An iterator over FASTA or FASTQ records.
pub type FastxIterator = Box<dyn Iterator<Item = Result<FastxOwnedRecord>> + Send>;

/// Opens a FASTA/FASTQ file (or standard input when the path is `-`), decompressing it if the
/// path has a GZIP extension or `decompress` is set and the path is not a plain FASTQ.
pub fn open_fastx(file: &Path, format: Format, decompress: bool) -> Result<FastxIterator> {
    // Open the file or standad input
    let raw_handle = if file.as_os_str() == "-" {
        Box::new(std::io::stdin()) as Box<dyn Read + Send>
    } else {
        let handle = File::open(file)
            .with_context(|| format!("Error opening input: {}", file.display()))?;
        Box::new(handle) as Box<dyn Read + Send>
    };
    // Wrap it in a buffer
    let buf_handle = BufReader::with_capacity(GZ_BUFSIZE, raw_handle);
    // Maybe wrap it in a decompressor
    let maybe_decoder_handle = {
        let is_gzip = is_gzip_path(&file) || (!is_fastq_like_path(&file) && decompress);
        if is_gzip {
            Box::new(MultiGzDecoder::new(buf_handle)) as Box<dyn Read + Send>
        } else {
            Box::new(buf_handle) as Box<dyn Read + Send>
        }
    };
    let iter: FastxIterator = match format {
        Format::FASTQ => Box::new(FastqToFastxIterator(FastqReader::with_capacity(
            maybe_decoder_handle,
            GZ_BUFSIZE,
        ))),
        Format::FASTA => Box::new(FastaToFastxIterator(FastaReader::with_capacity(
            maybe_decoder_handle,
            GZ_BUFSIZE,
        ))),
    };
    Ok(iter)
}
