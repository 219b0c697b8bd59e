use super::{command::Command, indexer::IndexerArgs};
use anyhow::{anyhow, Result};
use clap::Parser;
use flume::Receiver;
use itertools::Itertools;
use log::info;
use proglog::{CountFormatterKind, ProgLog, ProgLogBuilder};
use seedmap::{
    index::{KmerIndexer, KmerIndexes},
    seed::{
        find_all_matches,
        io::{
            InputMessage, OutputMessage, OutputResult, QueryThreadReader,
            READER_CHANNEL_NUM_CHUNKS,
        },
    },
    util::{contig::Contig, fastx::Format, version::built_info},
};
use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
    thread::ScopedJoinHandle,
};

/// Finds the k-mer seed matches of long reads against one or more reference contigs.
///
/// The reference contigs are indexed first, using the reads to ban over-represented unique
/// k-mers with the approximate strategy.  Each query (by default the reads themselves, otherwise
/// those given with `--queries`) is then matched on both strands against every contig.
///
/// For every query, contig and strand with at least one match, the output contains a header line
/// `>query<TAB>contig<TAB>+|-<TAB>number of matches`, followed by one line per match,
/// `query position<TAB>target position<TAB>target frequency`, sorted by target position.  Matches
/// within ten bases of the previously written target position are not written.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width=0)]
pub struct Seeds {
    #[clap(flatten)]
    indexer: IndexerArgs,

    /// The path to the input FASTA/FASTQ of long reads.
    #[clap(long, short = 'f', display_order = 2)]
    reads: PathBuf,

    /// The path to the FASTA/FASTQ of queries to match, if not the reads.
    #[clap(long, short = 'q', display_order = 2)]
    queries: Option<PathBuf>,
}

impl Seeds {
    /// Matches every query of each chunk against all the targets.
    fn match_queries(
        to_match_rx: &Receiver<InputMessage>,
        kmer_indexes: &KmerIndexes,
        indexer: &KmerIndexer,
    ) -> Result<()> {
        for msg in to_match_rx.iter() {
            let results: Vec<OutputResult> = msg
                .queries
                .into_iter()
                .map(|query| {
                    let matches =
                        find_all_matches(kmer_indexes, &query, indexer.hasher(), indexer.opts());
                    (query, matches)
                })
                .collect();
            msg.oneshot
                .send(OutputMessage { results })
                .map_err(|_| anyhow!("Error sending matches"))?;
        }
        Ok(())
    }

    /// Writes the matches of each chunk of queries in the order the queries were read.
    fn write_matches(
        to_output_rx: Receiver<Receiver<OutputMessage>>,
        targets: &[Contig],
        progress_logger: &ProgLog,
    ) -> Result<()> {
        let mut writer = BufWriter::new(io::stdout().lock());
        for receiver in to_output_rx.iter() {
            let msg = receiver.recv()?;
            for (query, all_matches) in msg.results {
                progress_logger.record();
                for query_matches in all_matches {
                    writeln!(
                        writer,
                        ">{}\t{}\t{}\t{}",
                        query.id,
                        targets[query_matches.target_idx].id,
                        query_matches.strand,
                        query_matches.matches.len()
                    )?;
                    write!(writer, "{}", query_matches.matches)?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Executes the seeds command
    pub fn execute(&self) -> Result<()> {
        info!("Starting seed matching...");
        let (targets, indexer, kmer_indexes) =
            self.indexer.build_indexes(Some(self.reads.as_path()))?;

        let threads = self.indexer.threads;
        let progress_logger = ProgLogBuilder::new()
            .name("seedmap-progress")
            .noun("queries")
            .verb("Matched")
            .unit((READER_CHANNEL_NUM_CHUNKS * threads).try_into()?)
            .count_formatter(CountFormatterKind::Comma)
            .build();

        let queries = self.queries.clone().unwrap_or_else(|| self.reads.clone());
        info!("Reading queries from {}", queries.display());
        let format = Format::from_path(&queries);
        let QueryThreadReader {
            handle,
            to_match_rx,
            to_output_rx,
        } = QueryThreadReader::new(queries, format, self.indexer.decompress, threads);

        std::thread::scope(|scope| {
            let workers: Vec<ScopedJoinHandle<Result<()>>> = (0..threads)
                .map(|_| {
                    let to_match_rx = to_match_rx.clone();
                    let kmer_indexes = &kmer_indexes;
                    let indexer = &indexer;
                    scope.spawn(move || Self::match_queries(&to_match_rx, kmer_indexes, indexer))
                })
                .collect_vec();
            drop(to_match_rx);

            // dropping the output receiver on error stops the reader and the workers
            let written = Self::write_matches(to_output_rx, &targets, &progress_logger);
            let joined = workers
                .into_iter()
                .try_for_each(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(e) => std::panic::resume_unwind(e),
                });
            written.and(joined)
        })?;

        match handle.join() {
            Ok(result) => result,
            Err(e) => std::panic::resume_unwind(e),
        }
    }
}

impl Command for Seeds {
    fn execute(&self) -> Result<()> {
        Seeds::execute(self)
    }
}
