use chrono::NaiveDate;
use skycast_core::store::{NewLocation, NewWeather, Store, StoreError, WeatherRecord};
use tempfile::TempDir;

async fn test_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::new(dir.path().join("test.db"));
    store.migrate().await.unwrap();
    (dir, store)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = Store::new(dir.path().join("test.db"));

    let first = store.migrate().await.unwrap();
    assert!(first > 0);
    let second = store.migrate().await.unwrap();
    assert_eq!(second, 0);
}

#[tokio::test]
async fn location_geometry_is_validated_and_canonicalized() {
    let (_dir, store) = test_store().await;

    let location = store
        .insert_location(NewLocation {
            name: "Colombo".to_string(),
            geom: "point ( 79.8612  6.9271 )".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(location.name, "Colombo");
    assert_eq!(location.geom_wkt.as_deref(), Some("POINT(79.8612 6.9271)"));

    let err = store
        .insert_location(NewLocation {
            name: "Nowhere".to_string(),
            geom: "LINESTRING(0 0, 1 1)".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidGeometry(_)));
}

#[tokio::test]
async fn duplicate_location_name_is_a_conflict() {
    let (_dir, store) = test_store().await;

    let new = NewLocation {
        name: "Colombo".to_string(),
        geom: "POINT(79.8612 6.9271)".to_string(),
    };
    store.insert_location(new.clone()).await.unwrap();
    let err = store.insert_location(new).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn weather_round_trips_with_joined_location() {
    let (_dir, store) = test_store().await;

    let location = store
        .insert_location(NewLocation {
            name: "Colombo".to_string(),
            geom: "POINT(79.8612 6.9271)".to_string(),
        })
        .await
        .unwrap();

    let created = store
        .insert_weather(NewWeather {
            date: date("2024-01-01"),
            temp_max: 30.0,
            temp_min: 24.0,
            precipitation: 5.2,
            location_id: Some(location.id),
        })
        .await
        .unwrap();
    assert_eq!(created.location.as_ref().unwrap().name, "Colombo");

    let fetched = store
        .get_weather_by_date(date("2024-01-01"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.date, date("2024-01-01"));
    assert_eq!(fetched.temp_max, 30.0);
    assert_eq!(fetched.temp_min, 24.0);
    assert_eq!(fetched.precipitation, 5.2);
    assert_eq!(fetched.location_id, Some(location.id));
    assert_eq!(fetched.location.unwrap().geom_wkt.as_deref(), Some("POINT(79.8612 6.9271)"));
}

#[tokio::test]
async fn missing_date_is_none() {
    let (_dir, store) = test_store().await;
    let found = store.get_weather_by_date(date("1999-12-31")).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn duplicate_date_is_a_conflict() {
    let (_dir, store) = test_store().await;

    let new = NewWeather {
        date: date("2024-01-01"),
        temp_max: 30.0,
        temp_min: 24.0,
        precipitation: 0.0,
        location_id: None,
    };
    store.insert_weather(new.clone()).await.unwrap();
    let err = store.insert_weather(new).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn list_weather_pages_in_date_order() {
    let (_dir, store) = test_store().await;

    for day in ["2024-01-03", "2024-01-01", "2024-01-02"] {
        store
            .insert_weather(NewWeather {
                date: date(day),
                temp_max: 30.0,
                temp_min: 24.0,
                precipitation: 0.0,
                location_id: None,
            })
            .await
            .unwrap();
    }

    let all = store.list_weather(0, 100).await.unwrap();
    let days: Vec<String> = all.iter().map(|w| w.date.to_string()).collect();
    assert_eq!(days, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);

    let page = store.list_weather(1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].date, date("2024-01-02"));
}

#[tokio::test]
async fn batch_insert_skips_existing_dates() {
    let (_dir, store) = test_store().await;

    store
        .insert_weather(NewWeather {
            date: date("2024-01-01"),
            temp_max: 30.0,
            temp_min: 24.0,
            precipitation: 0.0,
            location_id: None,
        })
        .await
        .unwrap();

    let rows = vec![
        NewWeather {
            date: date("2024-01-01"),
            temp_max: 99.0,
            temp_min: 0.0,
            precipitation: 0.0,
            location_id: None,
        },
        NewWeather {
            date: date("2024-01-02"),
            temp_max: 31.0,
            temp_min: 25.0,
            precipitation: 1.0,
            location_id: None,
        },
    ];
    let inserted = store.insert_weather_batch(rows).await.unwrap();
    assert_eq!(inserted, 1);

    // The pre-existing row is untouched
    let first = store
        .get_weather_by_date(date("2024-01-01"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.temp_max, 30.0);
}

#[tokio::test]
async fn locations_page_and_fetch_by_id_and_name() {
    let (_dir, store) = test_store().await;

    let colombo = store
        .insert_location(NewLocation {
            name: "Colombo".to_string(),
            geom: "POINT(79.8612 6.9271)".to_string(),
        })
        .await
        .unwrap();
    store
        .insert_location(NewLocation {
            name: "London".to_string(),
            geom: "POINT(-0.1278 51.5074)".to_string(),
        })
        .await
        .unwrap();

    let listed = store.list_locations(0, 10).await.unwrap();
    assert_eq!(listed.len(), 2);

    let by_id = store.get_location(colombo.id).await.unwrap().unwrap();
    assert_eq!(by_id.name, "Colombo");
    assert!(store.get_location(9999).await.unwrap().is_none());

    let by_name = store
        .get_location_by_name("London".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.geom_wkt.as_deref(), Some("POINT(-0.1278 51.5074)"));
}

// A record that went through the store serializes to JSON and parses back
// with every field intact
#[tokio::test]
async fn weather_record_survives_json_round_trip() {
    let (_dir, store) = test_store().await;

    let location = store
        .insert_location(NewLocation {
            name: "Colombo".to_string(),
            geom: "POINT(79.8612 6.9271)".to_string(),
        })
        .await
        .unwrap();
    store
        .insert_weather(NewWeather {
            date: date("2024-01-01"),
            temp_max: 30.0,
            temp_min: 24.0,
            precipitation: 5.2,
            location_id: Some(location.id),
        })
        .await
        .unwrap();

    let listed = store.list_weather(0, 10).await.unwrap();
    let encoded = serde_json::to_string(&listed[0]).unwrap();
    let decoded: WeatherRecord = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded, listed[0]);
    assert_eq!(decoded.date.to_string(), "2024-01-01");
    assert_eq!(decoded.location.unwrap().name, "Colombo");
}
