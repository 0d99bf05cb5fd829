//! The abstract block/mempool source and the driver that feeds the indexer
//! from it.

use jigdex_types::{BlockHash, Height, Timestamp, Txid};

use crate::indexer::Indexer;
use crate::IndexerError;

/// One block as delivered by the source.
#[derive(Clone, Debug)]
pub struct BlockData {
    pub height: u64,
    pub hash: BlockHash,
    pub time: Timestamp,
    pub txids: Vec<Txid>,
}

/// Answer to a `next_block` poll.
#[derive(Clone, Debug)]
pub enum NextBlock {
    /// The block following the caller's tip.
    Block(BlockData),
    /// The caller's tip is no longer on the best chain; rewind to the fork
    /// point and poll again.
    Reorg {
        fork_height: u64,
        fork_hash: BlockHash,
    },
    /// Nothing new yet.
    None,
}

/// Abstract chain source: confirmed blocks plus a mempool delta stream.
pub trait ChainSource {
    /// The block after `(height, hash)`, a reorg signal, or nothing.
    /// `None`/`None` asks for the first block the source knows.
    fn next_block(
        &mut self,
        height: Option<u64>,
        hash: Option<BlockHash>,
    ) -> Result<NextBlock, IndexerError>;

    /// Newly-seen mempool transactions since the last poll.
    fn mempool_delta(&mut self) -> Result<Vec<Txid>, IndexerError>;
}

/// Polling driver: advances the tip block by block, registers every txid,
/// rewinds on reorg, and evicts stale mempool entries. Download and parsing
/// of the registered transactions stay with the executor pipeline.
pub struct Crawler<S: ChainSource> {
    source: S,
    mempool_expiry_secs: u64,
}

impl<S: ChainSource> Crawler<S> {
    pub fn new(source: S, mempool_expiry_secs: u64) -> Self {
        Self {
            source,
            mempool_expiry_secs,
        }
    }

    /// One poll cycle. Returns `true` if a block was ingested (call again
    /// immediately), `false` when the source had nothing new.
    pub fn tick(&mut self, indexer: &mut Indexer) -> Result<bool, IndexerError> {
        for txid in self.source.mempool_delta()? {
            indexer.add_transaction(txid, Height::Mempool)?;
        }

        let expiry_cutoff = Timestamp::now().rewound_by(self.mempool_expiry_secs);
        indexer.evict_mempool_before(expiry_cutoff)?;

        match self
            .source
            .next_block(indexer.tip_height(), indexer.tip_hash())?
        {
            NextBlock::Block(block) => {
                tracing::info!(height = block.height, hash = %block.hash, txs = block.txids.len(), "ingesting block");
                for txid in &block.txids {
                    indexer.add_transaction(*txid, Height::Confirmed(block.height))?;
                    indexer.set_transaction_height(txid, Height::Confirmed(block.height))?;
                    indexer.set_transaction_time(txid, block.time)?;
                }
                indexer.set_tip(block.height, block.hash)?;
                Ok(true)
            }
            NextBlock::Reorg {
                fork_height,
                fork_hash,
            } => {
                tracing::warn!(fork_height, "reorg detected, rewinding");
                indexer.rewind_above(fork_height)?;
                indexer.set_tip(fork_height, fork_hash)?;
                Ok(true)
            }
            NextBlock::None => Ok(false),
        }
    }

    /// Poll until the source reports nothing new.
    pub fn drain(&mut self, indexer: &mut Indexer) -> Result<(), IndexerError> {
        while self.tick(indexer)? {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A source that replays a fixed script of answers.
    struct ScriptedSource {
        blocks: Vec<NextBlock>,
        mempool: Vec<Txid>,
    }

    impl ChainSource for ScriptedSource {
        fn next_block(
            &mut self,
            _height: Option<u64>,
            _hash: Option<BlockHash>,
        ) -> Result<NextBlock, IndexerError> {
            if self.blocks.is_empty() {
                Ok(NextBlock::None)
            } else {
                Ok(self.blocks.remove(0))
            }
        }

        fn mempool_delta(&mut self) -> Result<Vec<Txid>, IndexerError> {
            Ok(std::mem::take(&mut self.mempool))
        }
    }

    fn txid(n: u8) -> Txid {
        Txid::new([n; 32])
    }

    fn block(height: u64, hash_byte: u8, txids: Vec<Txid>) -> NextBlock {
        NextBlock::Block(BlockData {
            height,
            hash: BlockHash::new([hash_byte; 32]),
            time: Timestamp::new(1_000_000 + height),
            txids,
        })
    }

    fn temp_indexer() -> (tempfile::TempDir, Indexer) {
        let dir = tempfile::tempdir().expect("temp dir");
        let indexer = Indexer::open_at(dir.path()).expect("open indexer");
        (dir, indexer)
    }

    #[test]
    fn crawler_advances_tip_and_registers_txids() {
        let (_dir, mut indexer) = temp_indexer();
        let source = ScriptedSource {
            blocks: vec![
                block(1, 0x01, vec![txid(1)]),
                block(2, 0x02, vec![txid(2), txid(3)]),
            ],
            mempool: vec![txid(9)],
        };
        let mut crawler = Crawler::new(source, 3600);

        crawler.drain(&mut indexer).unwrap();

        assert_eq!(indexer.tip_height(), Some(2));
        assert_eq!(indexer.tip_hash(), Some(BlockHash::new([0x02; 32])));
        for (t, h) in [(txid(1), 1), (txid(2), 2), (txid(3), 2)] {
            let record = indexer.get_transaction(&t).unwrap();
            assert_eq!(record.height, Height::Confirmed(h));
        }
        assert!(indexer
            .get_transaction(&txid(9))
            .unwrap()
            .height
            .is_mempool());
    }

    #[test]
    fn crawler_confirms_mempool_transaction() {
        let (_dir, mut indexer) = temp_indexer();
        let source = ScriptedSource {
            blocks: vec![block(1, 0x01, vec![txid(5)])],
            mempool: vec![txid(5)],
        };
        let mut crawler = Crawler::new(source, 3600);

        crawler.drain(&mut indexer).unwrap();
        assert_eq!(
            indexer.get_transaction(&txid(5)).unwrap().height,
            Height::Confirmed(1)
        );
    }

    #[test]
    fn crawler_rewinds_on_reorg() {
        let (_dir, mut indexer) = temp_indexer();
        let source = ScriptedSource {
            blocks: vec![
                block(1, 0x01, vec![txid(1)]),
                block(2, 0x02, vec![txid(2)]),
                NextBlock::Reorg {
                    fork_height: 1,
                    fork_hash: BlockHash::new([0x01; 32]),
                },
                block(2, 0x22, vec![txid(4)]),
            ],
            mempool: vec![],
        };
        let mut crawler = Crawler::new(source, 3600);

        crawler.drain(&mut indexer).unwrap();

        assert_eq!(indexer.tip(), Some((2, BlockHash::new([0x22; 32]))));
        assert!(indexer.has_transaction(&txid(1)).unwrap());
        assert!(!indexer.has_transaction(&txid(2)).unwrap());
        assert!(indexer.has_transaction(&txid(4)).unwrap());
    }
}
