use std::{path::PathBuf, thread::JoinHandle};

use anyhow::{anyhow, Result};
use flume::{bounded, Receiver, Sender};

use super::QueryMatches;
use crate::util::{
    contig::Contig,
    fastx::{open_fastx, Format},
};

/// The number of query records to include per chunk.
pub const RECORDS_PER_CHUNK: usize = 10;

/// The number of chunks allowed in a channel, scaled by the # of threads.
pub const READER_CHANNEL_NUM_CHUNKS: usize = 100;

/// A message that is sent from a [`QueryThreadReader`] to the matcher threadpool to find the
/// seed matches of a chunk of queries.
#[derive(Debug)]
pub struct InputMessage {
    /// The queries to match
    pub queries: Vec<Contig>,

    /// Where the results will be sent after matching
    pub oneshot: Sender<OutputMessage>,
}

/// The query that was matched and its non-empty matches per target and strand.
pub type OutputResult = (Contig, Vec<QueryMatches>);

/// The container for a chunk of matched queries, one per input record.
#[derive(Debug)]
pub struct OutputMessage {
    pub results: Vec<OutputResult>,
}

/// A FASTA/FASTQ reader that runs in its own thread and chunks queries to send to a pool of
/// matchers.
pub struct QueryThreadReader {
    /// The [`JoinHandle`] for the thread that is reading.
    pub handle: JoinHandle<Result<()>>,
    /// The channel that will be receiving [`InputMessage`]s.
    pub to_match_rx: Receiver<InputMessage>,
    /// The channel that will be receiving oneshot receivers of chunks of matches, in input order.
    pub to_output_rx: Receiver<Receiver<OutputMessage>>,
}

impl QueryThreadReader {
    /// Writes the chunk of queries to the matching channel, as well as a receiver to the output
    /// channel.
    fn write_queries_to_txs(
        queries: Vec<Contig>,
        to_match_tx: &Sender<InputMessage>,
        to_output_tx: &Sender<Receiver<OutputMessage>>,
    ) -> Result<()> {
        let (oneshot_tx, oneshot_rx) = flume::unbounded();
        let input_msg = InputMessage {
            queries,
            oneshot: oneshot_tx,
        };
        to_match_tx
            .send(input_msg)
            .map_err(|_| anyhow!("Error sending queries to match"))?;
        to_output_tx
            .send(oneshot_rx)
            .map_err(|_| anyhow!("Error sending output receiver"))?;
        Ok(())
    }

    /// Creates a new `QueryThreadReader` reading in a new thread.
    pub fn new(file: PathBuf, format: Format, decompress: bool, threads: usize) -> Self {
        let (to_match_tx, to_match_rx) = bounded(READER_CHANNEL_NUM_CHUNKS * threads);

        // The receivers maintain the order of the queries.
        let (to_output_tx, to_output_rx) = bounded(READER_CHANNEL_NUM_CHUNKS * threads);

        let handle = std::thread::spawn(move || {
            let mut queries = Vec::with_capacity(RECORDS_PER_CHUNK);
            for record in open_fastx(&file, format, decompress)? {
                queries.push(Contig::from_record(&record?)?);
                if queries.len() >= RECORDS_PER_CHUNK {
                    Self::write_queries_to_txs(queries, &to_match_tx, &to_output_tx)?;
                    queries = Vec::with_capacity(RECORDS_PER_CHUNK);
                }
            }
            if !queries.is_empty() {
                Self::write_queries_to_txs(queries, &to_match_tx, &to_output_tx)?;
            }
            Ok(())
        });
        Self {
            handle,
            to_match_rx,
            to_output_rx,
        }
    }
}
