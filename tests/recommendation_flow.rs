mod common;

use std::sync::Arc;

use common::{drain_notices, ingredient, recipe_ids, recipes, FakeBackend};
use ingredient_scanner_lib::api::BackendError;
use ingredient_scanner_lib::events::{EventBus, NoticeLevel};
use ingredient_scanner_lib::models::RecipeSource;
use ingredient_scanner_lib::recommendations::{
    FetchOutcome, RecommendationConfig, RecommendationManager,
};

fn setup(
    backend: &Arc<FakeBackend>,
    config: RecommendationConfig,
) -> (RecommendationManager, EventBus) {
    let events = EventBus::new();
    let manager = RecommendationManager::new(backend.clone(), events.clone(), config);
    (manager, events)
}

#[tokio::test]
async fn low_confidence_batches_never_reach_the_backend() {
    let backend = FakeBackend::new();
    let (manager, _events) = setup(&backend, RecommendationConfig::default());

    let outcome = manager
        .on_detection_batch(&[ingredient("egg", 0.3), ingredient("flour", 0.49)])
        .await;

    assert_eq!(outcome, None);
    assert!(backend.recommend_requests().is_empty());
    assert!(!manager.snapshot().await.is_available);
}

#[tokio::test]
async fn new_ingredients_accumulate_and_merge_without_reordering() {
    let backend = FakeBackend::new();
    backend.push_recommendation(Ok(recipes(&["r1", "r2"])));
    backend.push_recommendation(Ok(recipes(&["r2", "r3"])));
    let (manager, events) = setup(&backend, RecommendationConfig::default());
    let mut rx = events.subscribe();

    let first = manager
        .on_detection_batch(&[ingredient("milk", 0.9), ingredient("egg", 0.3)])
        .await;
    assert_eq!(first, Some(FetchOutcome::Matched { added: 2 }));
    // nothing is "additional" on the first fetch
    assert!(drain_notices(&mut rx).is_empty());

    let second = manager
        .on_detection_batch(&[ingredient("Milk", 0.95), ingredient("egg", 0.8)])
        .await;
    assert_eq!(second, Some(FetchOutcome::Matched { added: 1 }));

    assert_eq!(
        backend.recommend_requests(),
        vec![vec!["milk".to_string()], vec!["Milk".to_string(), "egg".to_string()]],
        "the stronger sighting replaces the stored one"
    );

    let snapshot = manager.snapshot().await;
    assert_eq!(recipe_ids(&snapshot.current_recommendations), ["r1", "r2", "r3"]);
    assert!(snapshot.is_available);
    assert_eq!(snapshot.last_scan_ingredients.len(), 2);

    assert_eq!(
        drain_notices(&mut rx),
        vec![(
            NoticeLevel::Success,
            "Found 1 additional recipe recommendation!".to_string()
        )]
    );

    let history = manager.history().await;
    assert_eq!(history.len(), 2);
    assert!(history[0].id > history[1].id);
    assert!(history.iter().all(|s| s.source == RecipeSource::Matched));
}

#[tokio::test]
async fn repeated_batches_are_deduplicated() {
    let backend = FakeBackend::new();
    backend.push_recommendation(Ok(recipes(&["r1"])));
    let (manager, _events) = setup(&backend, RecommendationConfig::default());

    let batch = [ingredient("tomato", 0.8), ingredient("basil", 0.7)];
    assert!(manager.on_detection_batch(&batch).await.is_some());
    assert_eq!(manager.on_detection_batch(&batch).await, None);
    assert_eq!(manager.on_detection_batch(&batch[..1]).await, None);

    assert_eq!(backend.recommend_requests().len(), 1);
    assert_eq!(manager.history().await.len(), 1);
}

#[tokio::test]
async fn empty_matches_fall_back_to_popular_recipes() {
    let backend = FakeBackend::new();
    backend.push_recommendation(Ok(Vec::new()));
    backend.push_popular(Ok(recipes(&["p1", "p2", "p3", "p4", "p5"])));
    let (manager, events) = setup(&backend, RecommendationConfig::default());
    let mut rx = events.subscribe();

    let outcome = manager
        .on_detection_batch(&[ingredient("durian", 0.9)])
        .await;

    assert_eq!(outcome, Some(FetchOutcome::Fallback { count: 5 }));
    assert_eq!(*backend.popular_calls.lock().unwrap(), vec![5]);

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.current_recommendations.len(), 5);
    assert!(snapshot.high_confidence_ingredients.is_empty());

    let history = manager.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source, RecipeSource::Popular);
    assert_eq!(history[0].ingredients[0].name, "durian");

    assert_eq!(
        drain_notices(&mut rx),
        vec![(
            NoticeLevel::Info,
            "Showing popular recipes since no matches found for detected ingredients".to_string()
        )]
    );
}

#[tokio::test]
async fn service_failure_falls_back_with_its_own_notice() {
    let backend = FakeBackend::new();
    backend.push_recommendation(Err(BackendError::Network("connection refused".into())));
    backend.push_popular(Ok(recipes(&["p1"])));
    let (manager, events) = setup(&backend, RecommendationConfig::default());
    let mut rx = events.subscribe();

    let outcome = manager.on_detection_batch(&[ingredient("rice", 0.6)]).await;

    assert_eq!(outcome, Some(FetchOutcome::Fallback { count: 1 }));
    assert_eq!(
        drain_notices(&mut rx),
        vec![(
            NoticeLevel::Info,
            "Showing popular recipes (recommendation service unavailable)".to_string()
        )]
    );
}

#[tokio::test]
async fn failures_keep_an_existing_list() {
    let backend = FakeBackend::new();
    backend.push_recommendation(Ok(recipes(&["r1", "r2"])));
    backend.push_recommendation(Err(BackendError::Http {
        status: 502,
        message: "bad gateway".into(),
    }));
    backend.push_recommendation(Ok(Vec::new()));
    let (manager, events) = setup(&backend, RecommendationConfig::default());

    manager.on_detection_batch(&[ingredient("milk", 0.9)]).await;
    let mut rx = events.subscribe();

    let failed = manager.on_detection_batch(&[ingredient("egg", 0.9)]).await;
    assert_eq!(failed, Some(FetchOutcome::Preserved));
    assert_eq!(
        drain_notices(&mut rx),
        vec![(
            NoticeLevel::Warning,
            "Failed to fetch additional recommendations".to_string()
        )]
    );

    let unmatched = manager.on_detection_batch(&[ingredient("salt", 0.9)]).await;
    assert_eq!(unmatched, Some(FetchOutcome::Preserved));
    assert!(drain_notices(&mut rx).is_empty());

    assert!(backend.popular_calls.lock().unwrap().is_empty());
    assert_eq!(
        recipe_ids(&manager.snapshot().await.current_recommendations),
        ["r1", "r2"]
    );
    assert_eq!(manager.history().await.len(), 1);
}

#[tokio::test]
async fn nothing_to_show_reports_empty() {
    let backend = FakeBackend::new();
    let (manager, events) = setup(&backend, RecommendationConfig::default());
    let mut rx = events.subscribe();

    let outcome = manager.on_detection_batch(&[ingredient("lime", 0.9)]).await;
    assert_eq!(outcome, Some(FetchOutcome::Empty));
    assert!(manager.history().await.is_empty());
    assert_eq!(
        drain_notices(&mut rx),
        vec![(
            NoticeLevel::Info,
            "No recipe recommendations found for detected ingredients".to_string()
        )]
    );

    backend.push_recommendation(Ok(Vec::new()));
    backend.push_popular(Err(BackendError::Timeout));
    let outcome = manager.on_detection_batch(&[ingredient("lemon", 0.9)]).await;
    assert_eq!(outcome, Some(FetchOutcome::Empty));
    assert_eq!(
        drain_notices(&mut rx),
        vec![(
            NoticeLevel::Error,
            "Failed to load recipe recommendations".to_string()
        )]
    );
}

#[tokio::test]
async fn history_keeps_only_the_newest_sessions() {
    let backend = FakeBackend::new();
    let config = RecommendationConfig {
        history_limit: 3,
        ..RecommendationConfig::default()
    };
    let (manager, _events) = setup(&backend, config);

    for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        backend.push_recommendation(Ok(recipes(&[format!("r{i}").as_str()])));
        manager.on_detection_batch(&[ingredient(name, 0.9)]).await;
    }

    let history = manager.history().await;
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|pair| pair[0].id > pair[1].id));
    assert_eq!(recipe_ids(&history[0].recipes), ["r4"]);
    assert_eq!(recipe_ids(&history[2].recipes), ["r2"]);

    assert!(manager.get_session(history[1].id).await.is_some());
    assert_eq!(
        manager.snapshot().await.current_recommendations.len(),
        5,
        "the visible list is not bounded by history"
    );
}

#[tokio::test]
async fn marking_complete_is_idempotent_and_touches_only_the_head() {
    let backend = FakeBackend::new();
    let (manager, _events) = setup(&backend, RecommendationConfig::default());

    assert!(!manager.mark_scan_complete().await);

    backend.push_recommendation(Ok(recipes(&["r1"])));
    backend.push_recommendation(Ok(recipes(&["r2"])));
    manager.on_detection_batch(&[ingredient("milk", 0.9)]).await;
    manager.on_detection_batch(&[ingredient("egg", 0.9)]).await;

    assert!(manager.mark_scan_complete().await);
    let once = manager.history().await;
    assert!(manager.mark_scan_complete().await);
    let twice = manager.history().await;

    assert_eq!(once, twice);
    assert!(twice[0].scan_complete);
    assert!(!twice[1].scan_complete);
}

#[tokio::test]
async fn clear_forgets_processed_ingredients_but_keeps_history() {
    let backend = FakeBackend::new();
    backend.push_recommendation(Ok(recipes(&["r1"])));
    backend.push_recommendation(Ok(recipes(&["r1"])));
    let (manager, _events) = setup(&backend, RecommendationConfig::default());

    let batch = [ingredient("milk", 0.9)];
    manager.on_detection_batch(&batch).await;
    manager.clear().await;

    let snapshot = manager.snapshot().await;
    assert!(snapshot.current_recommendations.is_empty());
    assert!(snapshot.high_confidence_ingredients.is_empty());
    assert!(!snapshot.is_available);
    assert_eq!(manager.history().await.len(), 1);

    assert_eq!(
        manager.on_detection_batch(&batch).await,
        Some(FetchOutcome::Matched { added: 1 })
    );
    assert_eq!(manager.history().await.len(), 2);
}
