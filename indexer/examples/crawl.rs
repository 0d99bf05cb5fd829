//! Minimal end-to-end driver: a scripted chain source, the crawler, and a
//! toy executor that replays every announced transaction with an empty
//! result. Run with `cargo run --example crawl`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use jigdex_indexer::{
    BlockData, ChainSource, Crawler, Indexer, IndexerConfig, IndexerError, IndexerEvent, NextBlock,
};
use jigdex_types::{BlockHash, ExecutionResult, Timestamp, Txid};

/// Serves a fixed list of blocks, one per poll.
struct FixtureSource {
    blocks: VecDeque<BlockData>,
}

impl ChainSource for FixtureSource {
    fn next_block(
        &mut self,
        _height: Option<u64>,
        _hash: Option<BlockHash>,
    ) -> Result<NextBlock, IndexerError> {
        Ok(match self.blocks.pop_front() {
            Some(block) => NextBlock::Block(block),
            None => NextBlock::None,
        })
    }

    fn mempool_delta(&mut self) -> Result<Vec<Txid>, IndexerError> {
        Ok(Vec::new())
    }
}

fn main() -> Result<(), IndexerError> {
    let dir = tempfile::tempdir()?;
    let config = IndexerConfig {
        data_dir: dir.path().to_path_buf(),
        map_size: 64 * 1024 * 1024,
        ..IndexerConfig::default()
    };
    config.init_logging();
    let mut indexer = Indexer::open(&config)?;

    // The executor side of the contract: collect ReadyToExecute fires and
    // call back with a result. A real deployment replays the program here.
    let ready: Arc<Mutex<VecDeque<Txid>>> = Arc::new(Mutex::new(VecDeque::new()));
    let queue = Arc::clone(&ready);
    indexer.subscribe(Box::new(move |event| {
        if let IndexerEvent::ReadyToExecute { txid } = event {
            queue.lock().unwrap().push_back(*txid);
        }
    }));

    let txids: Vec<Txid> = (1..=4u8).map(|n| Txid::new([n; 32])).collect();
    let source = FixtureSource {
        blocks: VecDeque::from([
            BlockData {
                height: 1,
                hash: BlockHash::new([0x01; 32]),
                time: Timestamp::new(1_700_000_000),
                txids: txids[..2].to_vec(),
            },
            BlockData {
                height: 2,
                hash: BlockHash::new([0x02; 32]),
                time: Timestamp::new(1_700_000_600),
                txids: txids[2..].to_vec(),
            },
        ]),
    };
    let mut crawler = Crawler::new(source, 3600);
    crawler.drain(&mut indexer)?;

    // Pretend every transaction downloads as a plain executable payload
    // depending on the previous one.
    for (i, txid) in txids.iter().enumerate() {
        let deps = if i == 0 { vec![] } else { vec![txids[i - 1]] };
        indexer.store_parsed_executable(*txid, &[0x51], false, &deps, &[], &[])?;
    }

    loop {
        let next = ready.lock().unwrap().pop_front();
        let Some(txid) = next else { break };
        tracing::info!(txid = %txid, "executing");
        indexer.store_executed(txid, &ExecutionResult::default())?;
    }

    tracing::info!(
        tip = ?indexer.tip(),
        transactions = indexer.num_transactions()?,
        unexecuted = indexer.num_unexecuted(),
        "crawl complete"
    );
    Ok(())
}
