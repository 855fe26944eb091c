use crate::error::Result;
use repodex_core::StoreEntry;
use tantivy::schema::{
    Field, Schema, Value, FAST, INDEXED, STORED, STRING, TEXT,
};
use tantivy::{doc, TantivyDocument, Term};

/// Field handles of the record index. One document per coordinate.
#[derive(Debug, Clone)]
pub struct StoreSchema {
    pub schema: Schema,
    /// Canonical coordinate key, the unique term.
    pub key: Field,
    pub group: Field,
    pub artifact: Field,
    pub version: Field,
    pub name: Field,
    pub description: Field,
    pub plugin_prefix: Field,
    pub record_version: Field,
    pub deleted: Field,
    /// bincode-encoded [`StoreEntry`].
    pub payload: Field,
}

impl StoreSchema {
    pub fn build() -> Self {
        let mut builder = Schema::builder();

        let key = builder.add_text_field("uinfo", STRING | STORED);
        let group = builder.add_text_field("group", TEXT);
        let artifact = builder.add_text_field("artifact", TEXT);
        let version = builder.add_text_field("version", STRING);
        let name = builder.add_text_field("name", TEXT);
        let description = builder.add_text_field("description", TEXT);
        let plugin_prefix = builder.add_text_field("plugin_prefix", TEXT);
        let record_version = builder.add_u64_field("record_version", INDEXED | STORED | FAST);
        let deleted = builder.add_bool_field("deleted", INDEXED);
        let payload = builder.add_bytes_field("payload", STORED);

        Self {
            schema: builder.build(),
            key,
            group,
            artifact,
            version,
            name,
            description,
            plugin_prefix,
            record_version,
            deleted,
            payload,
        }
    }

    /// Fields the free-text search runs over.
    pub fn search_fields(&self) -> Vec<Field> {
        vec![
            self.group,
            self.artifact,
            self.name,
            self.description,
            self.plugin_prefix,
        ]
    }

    pub fn key_term(&self, key: &str) -> Term {
        Term::from_field_text(self.key, key)
    }

    pub fn live_term(&self) -> Term {
        Term::from_field_bool(self.deleted, false)
    }

    pub fn document(&self, entry: &StoreEntry) -> Result<TantivyDocument> {
        let payload = bincode::serialize(entry)?;
        let coordinate = entry.coordinate();
        let mut document = doc!(
            self.key => coordinate.key(),
            self.record_version => entry.record_version(),
            self.deleted => entry.is_tombstone(),
            self.payload => payload,
        );
        // Tombstones are not searchable.
        if let Some(record) = entry.as_live() {
            document.add_text(self.group, &coordinate.group_id);
            document.add_text(self.artifact, &coordinate.artifact_id);
            document.add_text(self.version, &coordinate.version);
            for (field, value) in [
                (self.name, &record.name),
                (self.description, &record.description),
                (self.plugin_prefix, &record.plugin_prefix),
            ] {
                if let Some(value) = value {
                    document.add_text(field, value);
                }
            }
        }
        Ok(document)
    }

    pub fn decode(&self, document: &TantivyDocument) -> Result<Option<StoreEntry>> {
        match document.get_first(self.payload).and_then(|v| v.as_bytes()) {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }
}
