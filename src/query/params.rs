//! Codec between `QueryState` and the location query string.
//!
//! The externally visible state is five optional parameters: `searchField`,
//! `searchValue`, `orderByField`, `orderByDirection`, `campaign`. Encoding
//! is a lossless round trip for every representable state. Decoding never
//! fails: unrecognized or incomplete combinations degrade to "no search" /
//! "no sort" / AllMode rather than raising.

use url::form_urlencoded;

use super::sort::{Direction, SortField};
use super::{OrderBy, QueryState, Search, SearchField};

const PARAM_SEARCH_FIELD: &str = "searchField";
const PARAM_SEARCH_VALUE: &str = "searchValue";
const PARAM_ORDER_BY_FIELD: &str = "orderByField";
const PARAM_ORDER_BY_DIRECTION: &str = "orderByDirection";
const PARAM_CAMPAIGN: &str = "campaign";

/// Encode a query state as a location query string (no leading `?`).
pub fn encode_params(state: &QueryState) -> String {
    let mut encoder = form_urlencoded::Serializer::new(String::new());

    if let Some(search) = &state.search {
        encoder.append_pair(PARAM_SEARCH_FIELD, search.field.wire());
        encoder.append_pair(PARAM_SEARCH_VALUE, &search.value);
    }
    if let Some(order_by) = &state.order_by {
        encoder.append_pair(PARAM_ORDER_BY_FIELD, order_by.field.canonical());
        encoder.append_pair(PARAM_ORDER_BY_DIRECTION, order_by.direction.wire());
    }
    if let Some(campaign) = state.campaign {
        encoder.append_pair(PARAM_CAMPAIGN, &campaign.to_string());
    }

    encoder.finish()
}

/// Decode a location query string (with or without a leading `?`).
pub fn decode_params(query: &str) -> QueryState {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut search_field = None;
    let mut search_value = None;
    let mut order_field = None;
    let mut order_direction = None;
    let mut campaign = None;

    // Last occurrence wins, matching browser location semantics
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            PARAM_SEARCH_FIELD => search_field = value.parse::<SearchField>().ok(),
            PARAM_SEARCH_VALUE => search_value = Some(value.into_owned()),
            PARAM_ORDER_BY_FIELD => order_field = SortField::from_canonical(&value),
            PARAM_ORDER_BY_DIRECTION => order_direction = Direction::from_wire(&value),
            PARAM_CAMPAIGN => campaign = value.parse::<u64>().ok(),
            _ => {}
        }
    }

    // A search needs both halves; a sort needs both halves. Anything less
    // decodes as absent.
    let search = match (search_field, search_value) {
        (Some(field), Some(value)) => Some(Search { field, value }),
        _ => None,
    };
    let order_by = match (order_field, order_direction) {
        (Some(field), Some(direction)) => Some(OrderBy { field, direction }),
        _ => None,
    };

    QueryState {
        campaign,
        search,
        order_by,
    }
}
