use venue_ops::domain::shared::pagination::{
    PaginationRequest, calculate_pagination, get_pagination_offset,
};

#[test]
fn pagination_clamps_hostile_input() {
    let meta = calculate_pagination(-1, 150, -5);
    assert_eq!((meta.page, meta.limit, meta.total), (1, 100, 0));
    assert_eq!(meta.next_page, None);
    assert_eq!(meta.prev_page, None);
}

#[test]
fn pagination_total_pages_round_up() {
    assert_eq!(calculate_pagination(1, 10, 0).total_pages, 0);
    assert_eq!(calculate_pagination(1, 10, 1).total_pages, 1);
    assert_eq!(calculate_pagination(1, 10, 10).total_pages, 1);
    assert_eq!(calculate_pagination(1, 10, 11).total_pages, 2);
}

#[test]
fn pagination_defaults_are_safe_and_stable() {
    let p = PaginationRequest::default();
    assert_eq!(p.page, 1);
    assert_eq!(p.limit, 20);
    assert_eq!(p.offset(), 0);
    assert_eq!(get_pagination_offset(4, 25), 75);
}

#[test]
fn pagination_meta_serializes_camel_case() {
    let json = serde_json::to_value(calculate_pagination(1, 10, 30)).unwrap();
    assert_eq!(json["totalPages"], 3);
    assert_eq!(json["hasNextPage"], true);
    assert_eq!(json["hasPrevPage"], false);
    assert_eq!(json["nextPage"], 2);
    assert!(json["prevPage"].is_null());
}
