use crate::error::Result;
use crate::schema::StoreSchema;
use crate::storage::CommitMarks;
use repodex_core::{ArtifactCoordinate, ArtifactRecord, StoreEntry};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{QueryParser, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{DocAddress, Index, Searcher, TantivyDocument};

/// Isolated read view of the last commit at acquisition time.
///
/// Holding a handle pins the segments it sees; writers keep going and later
/// commits stay invisible to it.
pub struct ReadHandle {
    index: Index,
    searcher: Searcher,
    fields: StoreSchema,
    marks: CommitMarks,
}

impl ReadHandle {
    pub(crate) fn new(
        index: Index,
        searcher: Searcher,
        fields: StoreSchema,
        marks: CommitMarks,
    ) -> Self {
        Self {
            index,
            searcher,
            fields,
            marks,
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.marks.repository_id
    }

    pub fn high_water(&self) -> u64 {
        self.marks.high_water
    }

    pub fn last_chunk_id(&self) -> Option<u64> {
        self.marks.last_chunk_id
    }

    pub fn marks(&self) -> &CommitMarks {
        &self.marks
    }

    pub fn get(&self, coordinate: &ArtifactCoordinate) -> Result<Option<StoreEntry>> {
        let query = TermQuery::new(
            self.fields.key_term(&coordinate.key()),
            IndexRecordOption::Basic,
        );
        let top = self.searcher.search(&query, &TopDocs::with_limit(1))?;
        match top.first() {
            Some((_, address)) => self.load(*address),
            None => Ok(None),
        }
    }

    pub fn get_live(&self, coordinate: &ArtifactCoordinate) -> Result<Option<ArtifactRecord>> {
        Ok(self.get(coordinate)?.and_then(StoreEntry::into_live))
    }

    /// Number of live records.
    pub fn len(&self) -> Result<usize> {
        let query = TermQuery::new(self.fields.live_term(), IndexRecordOption::Basic);
        Ok(self.searcher.search(&query, &Count)?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Visit every entry, live or tombstoned, in storage order.
    pub fn for_each_entry<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(StoreEntry) -> Result<()>,
    {
        for (ordinal, segment) in self.searcher.segment_readers().iter().enumerate() {
            for doc_id in segment.doc_ids_alive() {
                if let Some(entry) = self.load(DocAddress::new(ordinal as u32, doc_id))? {
                    visit(entry)?;
                }
            }
        }
        Ok(())
    }

    /// Entries written after `version`, oldest first.
    pub fn entries_since(&self, version: u64) -> Result<Vec<StoreEntry>> {
        let mut out = Vec::new();
        self.for_each_entry(|entry| {
            if entry.record_version() > version {
                out.push(entry);
            }
            Ok(())
        })?;
        out.sort_by_key(StoreEntry::record_version);
        Ok(out)
    }

    /// Live records ordered by coordinate.
    pub fn live_records(&self) -> Result<Vec<ArtifactRecord>> {
        let mut out = Vec::new();
        self.for_each_entry(|entry| {
            if let Some(record) = entry.into_live() {
                out.push(record);
            }
            Ok(())
        })?;
        out.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
        Ok(out)
    }

    /// Free-text search over group, artifact, name, description and plugin
    /// prefix. Best match first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(f32, ArtifactRecord)>> {
        let parser = QueryParser::for_index(&self.index, self.fields.search_fields());
        let query = parser.parse_query(query)?;
        let top = self.searcher.search(&query, &TopDocs::with_limit(limit.max(1)))?;

        let mut results = Vec::with_capacity(top.len());
        for (score, address) in top {
            if let Some(record) = self.load(address)?.and_then(StoreEntry::into_live) {
                results.push((score, record));
            }
        }
        Ok(results)
    }

    /// Explicit end of the read; dropping the handle is equivalent.
    pub fn release(self) {}

    fn load(&self, address: DocAddress) -> Result<Option<StoreEntry>> {
        let document: TantivyDocument = self.searcher.doc(address)?;
        self.fields.decode(&document)
    }
}
