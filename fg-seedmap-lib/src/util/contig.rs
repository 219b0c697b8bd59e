use std::{io::BufRead, path::Path};

use crate::util::{
    dna::reverse_complement,
    fastx::{header_to_name, open_fastx, FastxOwnedRecord, Format, GZ_BUFSIZE},
};
use anyhow::{ensure, Result};
use fgoxide::io::Io;
use itertools::Itertools;
use seq_io::fasta::{Reader as FastaReader, Record as FastaRecord};

/// A named DNA sequence.  Sequences are stored upper-case when read from a file.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Contig {
    pub id: String,
    pub seq: Vec<u8>,
}

impl Contig {
    /// Creates a new `Contig` with the given name and DNA sequence.
    pub fn new(id: &str, seq: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            seq: seq.to_vec(),
        }
    }

    /// Creates a new `Contig` from a FASTA/FASTQ record, upper-casing its bases.
    pub fn from_record(record: &FastxOwnedRecord) -> Result<Self> {
        Ok(Self {
            id: record.name()?,
            seq: record.seq_upper_case(),
        })
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// The reverse complement of this contig, with the same name.
    pub fn reverse_complement(&self) -> Self {
        Self {
            id: self.id.clone(),
            seq: reverse_complement(&self.seq),
        }
    }
}

/// Reads the target contigs from a (possibly GZIP compressed) FASTA.
pub fn from_fasta<P: AsRef<Path>>(file: &P) -> Result<Vec<Contig>> {
    let fg_io: Io = Io::new(5, GZ_BUFSIZE);
    let source: FastaReader<Box<dyn BufRead + Send>> =
        FastaReader::with_capacity(fg_io.new_reader(file)?, GZ_BUFSIZE);

    let contigs: Vec<Contig> = source
        .into_records()
        .map(|record| {
            let record = record?;
            let sequence = record
                .seq()
                .iter()
                .map(u8::to_ascii_uppercase)
                .collect_vec();
            let name = header_to_name(record.head())?;
            Ok(Contig::new(&name, &sequence))
        })
        .collect::<Result<Vec<Contig>>>()?;

    ensure!(!contigs.is_empty(), "Found no sequences in the FASTA");

    Ok(contigs)
}

/// Reads all records of a FASTA/FASTQ file into memory, guessing the format from the extension.
pub fn from_fastx<P: AsRef<Path>>(file: &P, decompress: bool) -> Result<Vec<Contig>> {
    let path = file.as_ref();
    open_fastx(path, Format::from_path(&path), decompress)?
        .map(|record| Contig::from_record(&record?))
        .collect()
}

#[cfg(test)]
pub mod tests {
    use std::io::Write;

    use super::{from_fasta, from_fastx, Contig};
    use fgoxide::io::Io;

    #[test]
    fn test_reverse_complement() {
        let contig = Contig::new("chr1", b"AACGTT");
        assert_eq!(contig.reverse_complement(), Contig::new("chr1", b"AACGTT"));
        let contig = Contig::new("chr2", b"AAAC");
        assert_eq!(contig.reverse_complement().seq, b"GTTT".to_vec());
        assert_eq!(contig.len(), 4);
        assert!(!contig.is_empty());
    }

    #[test]
    fn test_from_fasta() {
        let dir = std::env::temp_dir().join(format!("seedmap-contig-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ref.fa");
        Io::default()
            .write_lines(&path, [">chr1 description", "acgt", "ACGT", ">chr2", "TTTT"])
            .unwrap();
        let contigs = from_fasta(&path).unwrap();
        assert_eq!(
            contigs,
            vec![Contig::new("chr1", b"ACGTACGT"), Contig::new("chr2", b"TTTT")]
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_fastx_fastq() {
        let dir = std::env::temp_dir().join(format!("seedmap-reads-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reads.fq");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"@r1 comment\nacgt\n+\nIIII\n@r2\nGGCC\n+\nIIII\n")
            .unwrap();
        drop(file);
        let reads = from_fastx(&path, false).unwrap();
        assert_eq!(
            reads,
            vec![Contig::new("r1", b"ACGT"), Contig::new("r2", b"GGCC")]
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_fasta_empty_is_error() {
        let dir = std::env::temp_dir().join(format!("seedmap-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.fa");
        std::fs::File::create(&path).unwrap();
        assert!(from_fasta(&path).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
