/// Data layer: input records, loading, and per-field normalization.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   Table   │  column order + Vec<Row>
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  raw cell → escaped document token
///   └───────────┘
/// ```

pub mod loader;
pub mod model;
pub mod normalize;
