pub mod language_ids;
