pub mod cache;
pub mod edits;
pub mod error;
pub mod fetch;
pub mod query;
pub mod remote;
pub mod scroll;
pub mod session;
pub mod types;

pub use cache::{CollectionCache, RecordPatch};
pub use edits::{AdjustmentDebouncer, DEFAULT_DEBOUNCE};
pub use error::{AdbookError, Result};
pub use fetch::{FetchCoordinator, FetchKind, FetchPhase, FetchTicket};
pub use query::{
    Direction, Mode, OrderBy, QueryState, QueryVariables, Search, SearchField, SortField,
    decode_params, encode_params,
};
pub use remote::{
    DEFAULT_PAGE_SIZE, LineItemEdge, LineItemPage, MutationService, PageInfo, PageRequest,
    QueryService,
};
pub use scroll::{ManualVisibility, ScrollSentinel, Subscription, VisibilitySource};
pub use session::{ReviewSession, SessionConfig};
pub use types::{Campaign, ExportStatus, Exportation, LineItem};
