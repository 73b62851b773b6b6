//! C5 Embedder — batches unembedded, tagged pain records through the
//! configured embedding backend and persists the resulting vectors (§4.5).

use painmine_embed::{Embedder, EmbeddingBatcher};
use painmine_store::embedding::EmbeddingStore;
use painmine_store::pain::PainStore;
use sqlx::PgPool;
use std::sync::Arc;

pub struct EmbedRun {
    pub embedded: u32,
}

pub async fn run(pool: &PgPool, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<EmbedRun, sqlx::Error> {
    let mut run = EmbedRun { embedded: 0 };

    let records = PainStore::select_unembedded(pool, batch_size as i64).await?;
    let mut batcher = EmbeddingBatcher::new(embedder, batch_size);

    for record in &records {
        match batcher.add(record.id, record.raw_quote.clone()).await {
            Ok(Some(flushed)) => persist(pool, &flushed, &mut run).await?,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(record_id = record.id, error = %e, "embedding batch add failed");
            }
        }
    }

    match batcher.flush().await {
        Ok(flushed) => persist(pool, &flushed, &mut run).await?,
        Err(e) => tracing::warn!(error = %e, "final embedding flush failed"),
    }

    Ok(run)
}

async fn persist(pool: &PgPool, flushed: &[(i64, Vec<f32>)], run: &mut EmbedRun) -> Result<(), sqlx::Error> {
    for (pain_record_id, vector) in flushed {
        let embedding_id = EmbeddingStore::insert(pool, *pain_record_id, vector).await?;
        PainStore::set_embedding_id(pool, *pain_record_id, embedding_id).await?;
        run.embedded += 1;
    }
    Ok(())
}
