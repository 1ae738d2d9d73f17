//! Tantivy-based favorites index.
//!
//! Group numbers are indexed as lowercased character n-grams, so a single
//! term lookup answers a case-insensitive substring query.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::DocSetCollector;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, NgramTokenizer, TextAnalyzer};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::FavoriteGroup;

const NGRAM_TOKENIZER: &str = "group_ngram";

/// Longest substring the index can answer; longer queries are rejected.
pub const MAX_QUERY_CHARS: usize = 16;

/// Search index schema fields.
struct SearchFields {
    user_id: Field,
    group_number: Field,
    /// `user_id` + separator + `group_number`, for exact deletes
    pair: Field,
}

/// Tantivy search index over favorite group numbers.
pub struct FavoriteSearchIndex {
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl FavoriteSearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        // Define schema
        let mut schema_builder = Schema::builder();
        let group_indexing = TextFieldIndexing::default()
            .set_tokenizer(NGRAM_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqs);
        schema_builder.add_text_field(
            "group_number",
            TextOptions::default()
                .set_indexing_options(group_indexing)
                .set_stored(),
        );
        schema_builder.add_text_field("user_id", STRING | STORED);
        schema_builder.add_text_field("pair", STRING);
        let schema = schema_builder.build();

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        // Tokenizers are not persisted with the index
        let analyzer = TextAnalyzer::builder(NgramTokenizer::new(1, MAX_QUERY_CHARS, false)?)
            .filter(LowerCaser)
            .build();
        index.tokenizers().register(NGRAM_TOKENIZER, analyzer);

        // Resolve fields from the on-disk schema so a stale index fails here
        let schema = index.schema();
        let fields = SearchFields {
            user_id: schema.get_field("user_id")?,
            group_number: schema.get_field("group_number")?,
            pair: schema.get_field("pair")?,
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from stored favorites.
    pub async fn rebuild(&self, favorites: &[FavoriteGroup]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        // Clear existing index
        writer.delete_all_documents()?;

        for favorite in favorites {
            writer.add_document(self.create_document(&favorite.user_id, &favorite.group_number))?;
        }

        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::info!("Favorites index rebuilt with {} entries", favorites.len());
        Ok(())
    }

    /// Index a single favorite, replacing any previous entry for the pair.
    pub async fn index_favorite(&self, user_id: &str, group_number: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.pair_term(user_id, group_number));
        writer.add_document(self.create_document(user_id, group_number))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a favorite from the index.
    pub async fn remove_favorite(&self, user_id: &str, group_number: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.pair_term(user_id, group_number));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Every group number of `user_id`'s favorites containing `query`,
    /// ignoring case. Hits are unranked; callers order and cap them.
    ///
    /// Fails for an empty query or one longer than [`MAX_QUERY_CHARS`].
    pub fn search(&self, user_id: &str, query: &str) -> Result<Vec<String>, AppError> {
        let needle = query.to_lowercase();
        let length = needle.chars().count();
        if length == 0 || length > MAX_QUERY_CHARS {
            return Err(AppError::Search(format!(
                "Query of {} characters is outside the indexed range 1..={}",
                length, MAX_QUERY_CHARS
            )));
        }
        let searcher = self.reader.searcher();

        let subqueries: Vec<(Occur, Box<dyn Query>)> = vec![
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.user_id, user_id),
                    IndexRecordOption::Basic,
                )),
            ),
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.group_number, &needle),
                    IndexRecordOption::Basic,
                )),
            ),
        ];
        let query = BooleanQuery::new(subqueries);

        let addresses = searcher
            .search(&query, &DocSetCollector)
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let group_numbers = addresses
            .into_iter()
            .filter_map(|doc_address| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                Some(doc.get_first(self.fields.group_number)?.as_str()?.to_string())
            })
            .collect();

        Ok(group_numbers)
    }

    fn create_document(&self, user_id: &str, group_number: &str) -> TantivyDocument {
        doc!(
            self.fields.user_id => user_id.to_string(),
            self.fields.group_number => group_number.to_string(),
            self.fields.pair => pair_key(user_id, group_number)
        )
    }

    fn pair_term(&self, user_id: &str, group_number: &str) -> Term {
        Term::from_field_text(self.fields.pair, &pair_key(user_id, group_number))
    }
}

fn pair_key(user_id: &str, group_number: &str) -> String {
    format!("{}\u{1f}{}", user_id, group_number)
}
