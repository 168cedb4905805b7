/// Data layer: core types, loading, filtering, and aggregation.
///
/// Architecture:
/// ```text
///  incidents.csv / .parquet      neighborhoods.geojson
///            │                            │
///            ▼                            ▼
///       ┌──────────┐               ┌──────────┐
///       │  loader   │  one-shot startup parse │
///       └──────────┘               └──────────┘
///            │                            │
///            └──────────┬─────────────────┘
///                       ▼
///               ┌──────────────┐
///               │ CrimeDataset  │  immutable after load
///               └──────────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  filter   │  Selection → matching row indices
///                 └──────────┘
///                       │
///                       ▼
///                ┌───────────┐
///                │ aggregate  │  counts, pivots, moving average,
///                └───────────┘  region join
/// ```
///
/// Everything below `loader` is pure: the same dataset and selection always
/// produce the same tables, and nothing here touches the filesystem or any
/// rendering API.

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
