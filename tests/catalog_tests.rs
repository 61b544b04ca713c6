use kitchen_helper::catalog::{CatalogSearch, InMemoryCatalog};
use kitchen_helper::types::{SearchPreferences, Tier};
use std::sync::Arc;

use test_utils::{CountingCatalog, MockDataBuilder};

fn search_over(catalog: &Arc<CountingCatalog>) -> CatalogSearch {
    CatalogSearch::new(Arc::clone(catalog) as Arc<_>)
}

#[tokio::test]
async fn test_highest_scoring_qualifying_entry_wins() {
    let catalog = Arc::new(CountingCatalog::new(MockDataBuilder::chicken_catalog()));
    let search = search_over(&catalog);
    let request = MockDataBuilder::request(&["chicken", "rice"], Tier::Basic);

    let hit = search
        .search(&request, &SearchPreferences::default())
        .await
        .expect("search succeeds")
        .expect("a catalog entry should match");

    assert_eq!(hit.id, 2);
    assert!((hit.quality_score - 95.0).abs() < f64::EPSILON);
    assert_eq!(hit.usage_count, 1);
    assert_eq!(catalog.usage_count(2), Some(1));
    assert_eq!(catalog.usage_count(1), Some(0));
    assert_eq!(catalog.increments(), 1);
}

#[tokio::test]
async fn test_no_overlap_returns_none() {
    let catalog = Arc::new(CountingCatalog::new(MockDataBuilder::chicken_catalog()));
    let search = search_over(&catalog);
    let request = MockDataBuilder::request(&["salmon"], Tier::Premium);

    let hit = search
        .search(&request, &SearchPreferences::default())
        .await
        .expect("search succeeds");

    assert!(hit.is_none());
    assert_eq!(catalog.increments(), 0);
}

#[tokio::test]
async fn test_tier_without_catalog_never_queries() {
    let catalog = Arc::new(CountingCatalog::new(MockDataBuilder::chicken_catalog()));
    let search = search_over(&catalog);
    let request = MockDataBuilder::request(&["chicken", "rice"], Tier::Free);

    let hit = search
        .search(&request, &SearchPreferences::default())
        .await
        .expect("search succeeds");

    assert!(hit.is_none());
    assert_eq!(catalog.queries(), 0);
}

#[tokio::test]
async fn test_below_half_coverage_is_rejected() {
    let entry = MockDataBuilder::catalog_entry(
        3,
        "Paella",
        &["chicken", "rice", "saffron", "peas", "peppers"],
        99.0,
    );
    let catalog = Arc::new(CountingCatalog::new(vec![entry]));
    let search = search_over(&catalog);

    // 2 of 5 ingredients covered
    let request = MockDataBuilder::request(&["chicken", "rice"], Tier::Pro);
    assert!(
        search
            .search(&request, &SearchPreferences::default())
            .await
            .expect("search succeeds")
            .is_none()
    );

    // 3 of 5 covered
    let request = MockDataBuilder::request(&["chicken", "rice", "frozen peas"], Tier::Pro);
    assert!(
        search
            .search(&request, &SearchPreferences::default())
            .await
            .expect("search succeeds")
            .is_some()
    );
}

#[tokio::test]
async fn test_hard_filters_exclude_entries() {
    let mut vegan = MockDataBuilder::catalog_entry(10, "Tofu Rice", &["tofu", "rice"], 70.0);
    vegan.categories.vegan = true;
    vegan.categories.vegetarian = true;
    let mut sugary = MockDataBuilder::catalog_entry(11, "Rice Pudding", &["rice", "milk"], 90.0);
    sugary.nutrition.carbs = 80.0;
    sugary.gi = 85;

    let catalog = Arc::new(CountingCatalog::new(vec![vegan, sugary]));
    let search = search_over(&catalog);
    let request = MockDataBuilder::request(&["rice", "tofu", "milk"], Tier::Basic);

    let hit = search
        .search(
            &request,
            &SearchPreferences {
                vegan: true,
                ..Default::default()
            },
        )
        .await
        .expect("search succeeds")
        .expect("vegan entry matches");
    assert_eq!(hit.id, 10);

    let hit = search
        .search(
            &request,
            &SearchPreferences {
                max_gi: Some(55),
                ..Default::default()
            },
        )
        .await
        .expect("search succeeds")
        .expect("low gi entry matches");
    assert_eq!(hit.id, 10);

    let hit = search
        .search(
            &request,
            &SearchPreferences {
                max_carbs: Some(20.0),
                ..Default::default()
            },
        )
        .await
        .expect("search succeeds");
    assert!(hit.is_none());
}

#[tokio::test]
async fn test_tier_slice_limits_visible_entries() {
    // 1001 entries: the basic tier sees the top 1000, so the weakest entry is out of reach
    let mut entries: Vec<_> = (0..1000)
        .map(|i| MockDataBuilder::catalog_entry(i, "Filler", &["quinoa"], 50.0))
        .collect();
    entries.push(MockDataBuilder::catalog_entry(5000, "Hidden Gem", &["salmon"], 1.0));

    let catalog = Arc::new(CountingCatalog::new(entries));
    let search = search_over(&catalog);

    let basic = MockDataBuilder::request(&["salmon"], Tier::Basic);
    assert!(
        search
            .search(&basic, &SearchPreferences::default())
            .await
            .expect("search succeeds")
            .is_none()
    );

    let premium = MockDataBuilder::request(&["salmon"], Tier::Premium);
    let hit = search
        .search(&premium, &SearchPreferences::default())
        .await
        .expect("search succeeds")
        .expect("premium sees the whole catalog");
    assert_eq!(hit.id, 5000);
}

#[tokio::test]
async fn test_usage_failure_keeps_match() {
    let catalog = Arc::new(CountingCatalog::new(MockDataBuilder::chicken_catalog()));
    catalog.fail_increments();
    let search = search_over(&catalog);
    let request = MockDataBuilder::request(&["chicken", "rice"], Tier::Basic);

    let hit = search
        .search(&request, &SearchPreferences::default())
        .await
        .expect("search succeeds")
        .expect("match survives a failed usage update");
    assert_eq!(hit.id, 2);
    assert_eq!(hit.usage_count, 0);
    assert_eq!(catalog.increments(), 1);
}

#[tokio::test]
async fn test_in_memory_catalog_works_as_source() {
    let source = Arc::new(InMemoryCatalog::from_entries(MockDataBuilder::chicken_catalog()));
    let search = CatalogSearch::new(Arc::clone(&source) as Arc<_>);
    let request = MockDataBuilder::request(&["Chicken", "RICE"], Tier::BusinessTeam);

    let hit = search
        .search(&request, &SearchPreferences::default())
        .await
        .expect("search succeeds")
        .expect("case-insensitive match");
    assert_eq!(hit.id, 2);
    assert_eq!(source.usage_count(2), Some(1));
}
