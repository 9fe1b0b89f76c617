//! Write-pipeline integration tests: aggregates, cascades, uniqueness,
//! and the publish quota. These need a live PostgreSQL at DATABASE_URL
//! and are ignored by default; run with `cargo test -- --ignored`.

use std::sync::Arc;

use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

use common::database::{self, DatabaseConfig};
use common::store::{DocumentStore, FilterClause};

use api::error::ApiError;
use api::geocoder::FixedGeocoder;
use api::guards::{check_bootcamp_quota, check_ownership};
use api::hooks::{BootcampHooks, CourseHooks, ReviewHooks};
use api::models::bootcamp::{Bootcamp, Career, CreateBootcamp, Location};
use api::models::course::{Course, CreateCourse, MinimumSkill};
use api::models::review::{CreateReview, Review};
use api::models::user::{Role, User};
use api::service::{CollectionService, Populate, Resource};

struct Services {
    store: DocumentStore,
    bootcamps: CollectionService<Bootcamp>,
    courses: CollectionService<Course>,
    reviews: CollectionService<Review>,
}

fn fixed_location() -> Location {
    Location {
        kind: "Point".to_string(),
        coordinates: [-71.0589, 42.3601],
        formatted_address: None,
        street: None,
        city: Some("Boston".to_string()),
        state: None,
        zipcode: Some("02215".to_string()),
        country: None,
    }
}

async fn services() -> Services {
    let config = DatabaseConfig::from_env().expect("database config");
    let pool = database::init_pool(&config).await.expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    for table in ["reviews", "courses", "bootcamps", "users"] {
        sqlx::query(&format!("TRUNCATE {table}"))
            .execute(&pool)
            .await
            .expect("truncate");
    }

    let store = DocumentStore::new(pool);
    Services {
        bootcamps: CollectionService::new(
            store.clone(),
            BootcampHooks {
                geocoder: Arc::new(FixedGeocoder(fixed_location())),
            },
        ),
        courses: CollectionService::new(store.clone(), CourseHooks),
        reviews: CollectionService::new(store.clone(), ReviewHooks),
        store,
    }
}

fn publisher() -> User {
    User::new(
        "Publisher".to_string(),
        format!("{}@devcamp.io", Uuid::new_v4()),
        Role::Publisher,
        "$argon2id$fake".to_string(),
    )
}

async fn seed_bootcamp(services: &Services, owner: Uuid) -> Uuid {
    let payload = CreateBootcamp {
        name: format!("Camp {}", Uuid::new_v4()),
        description: None,
        website: None,
        phone: None,
        email: None,
        address: "233 Bay State Rd Boston MA 02215".to_string(),
        careers: vec![Career::WebDevelopment],
        housing: false,
        job_assistance: false,
        job_guarantee: false,
        accept_gi: false,
    };
    let doc = services
        .bootcamps
        .create(payload.into_bootcamp(owner))
        .await
        .expect("create bootcamp");
    doc["id"].as_str().unwrap().parse().unwrap()
}

fn course_payload(tuition: f64) -> CreateCourse {
    CreateCourse {
        title: format!("Course {}", Uuid::new_v4()),
        description: "Course description".to_string(),
        weeks: 8,
        tuition,
        minimum_skill: MinimumSkill::Beginner,
        scholarship_available: false,
    }
}

async fn average_cost(services: &Services, bootcamp: Uuid) -> serde_json::Value {
    let doc = services
        .store
        .find_by_id(Bootcamp::COLLECTION, bootcamp)
        .await
        .unwrap()
        .expect("bootcamp present");
    doc["averageCost"].clone()
}

#[tokio::test]
#[ignore]
#[serial]
async fn course_writes_keep_the_average_cost_at_the_exact_mean() {
    let services = services().await;
    let owner = publisher();
    let bootcamp = seed_bootcamp(&services, owner.id).await;

    let first = services
        .courses
        .create(course_payload(1000.0).into_course(bootcamp, owner.id))
        .await
        .unwrap();
    services
        .courses
        .create(course_payload(1005.0).into_course(bootcamp, owner.id))
        .await
        .unwrap();
    // The stored aggregate is the unrounded mean
    assert_eq!(average_cost(&services, bootcamp).await, json!(1002.5));

    let first_id: Uuid = first["id"].as_str().unwrap().parse().unwrap();
    services.courses.delete(first_id).await.unwrap();
    assert_eq!(average_cost(&services, bootcamp).await, json!(1005.0));
}

#[tokio::test]
#[ignore]
#[serial]
async fn bulk_course_updates_recompute_the_average_cost() {
    let services = services().await;
    let owner = publisher();
    let bootcamp = seed_bootcamp(&services, owner.id).await;

    services
        .courses
        .create(course_payload(1000.0).into_course(bootcamp, owner.id))
        .await
        .unwrap();
    services
        .courses
        .create(course_payload(2000.0).into_course(bootcamp, owner.id))
        .await
        .unwrap();
    assert_eq!(average_cost(&services, bootcamp).await, json!(1500.0));

    let affected = services
        .courses
        .update_many(
            &[FilterClause::eq_id("bootcamp", bootcamp)],
            json!({ "tuition": 5000.0 }),
        )
        .await
        .unwrap();
    assert_eq!(affected, 2);
    assert_eq!(average_cost(&services, bootcamp).await, json!(5000.0));
}

#[tokio::test]
#[ignore]
#[serial]
async fn single_course_reads_embed_the_parent_summary() {
    let services = services().await;
    let owner = publisher();
    let bootcamp = seed_bootcamp(&services, owner.id).await;

    let course = services
        .courses
        .create(course_payload(4000.0).into_course(bootcamp, owner.id))
        .await
        .unwrap();
    let course_id: Uuid = course["id"].as_str().unwrap().parse().unwrap();

    let doc = services
        .courses
        .get_doc(
            course_id,
            Populate::Parent {
                collection: Bootcamp::COLLECTION,
                field: "bootcamp",
                select: &["name", "description"],
            },
        )
        .await
        .unwrap();
    let parent = doc["bootcamp"].as_object().expect("embedded parent");
    assert!(parent.contains_key("id"));
    assert!(parent.contains_key("name"));
    assert!(!parent.contains_key("address"));
}

#[tokio::test]
#[ignore]
#[serial]
async fn removing_the_last_course_clears_the_aggregate() {
    let services = services().await;
    let owner = publisher();
    let bootcamp = seed_bootcamp(&services, owner.id).await;

    let course = services
        .courses
        .create(course_payload(9000.0).into_course(bootcamp, owner.id))
        .await
        .unwrap();
    assert_eq!(average_cost(&services, bootcamp).await, json!(9000.0));

    let course_id: Uuid = course["id"].as_str().unwrap().parse().unwrap();
    services.courses.delete(course_id).await.unwrap();
    assert_eq!(average_cost(&services, bootcamp).await, json!(null));
}

#[tokio::test]
#[ignore]
#[serial]
async fn deleting_a_bootcamp_cascades_to_its_children() {
    let services = services().await;
    let owner = publisher();
    let bootcamp = seed_bootcamp(&services, owner.id).await;

    let course = services
        .courses
        .create(course_payload(7000.0).into_course(bootcamp, owner.id))
        .await
        .unwrap();
    let review = services
        .reviews
        .create(
            CreateReview {
                title: "Great camp".to_string(),
                text: "Learned plenty".to_string(),
                rating: 8.0,
            }
            .into_review(bootcamp, Uuid::new_v4()),
        )
        .await
        .unwrap();

    services.bootcamps.delete(bootcamp).await.unwrap();

    let course_id: Uuid = course["id"].as_str().unwrap().parse().unwrap();
    let review_id: Uuid = review["id"].as_str().unwrap().parse().unwrap();
    assert!(
        services
            .store
            .find_by_id(Course::COLLECTION, course_id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        services
            .store
            .find_by_id(Review::COLLECTION, review_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[ignore]
#[serial]
async fn one_review_per_user_and_bootcamp() {
    let services = services().await;
    let owner = publisher();
    let bootcamp = seed_bootcamp(&services, owner.id).await;
    let reviewer = Uuid::new_v4();

    let review = CreateReview {
        title: "Solid camp".to_string(),
        text: "Good value".to_string(),
        rating: 7.0,
    };
    services
        .reviews
        .create(review.clone().into_review(bootcamp, reviewer))
        .await
        .unwrap();

    let err = services
        .reviews
        .create(review.into_review(bootcamp, reviewer))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Duplicate(_)));
}

#[tokio::test]
#[ignore]
#[serial]
async fn publishers_may_own_a_single_bootcamp() {
    let services = services().await;
    let owner = publisher();
    seed_bootcamp(&services, owner.id).await;

    let err = check_bootcamp_quota(&services.store, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let mut admin = publisher();
    admin.role = Role::Admin;
    check_bootcamp_quota(&services.store, &admin).await.unwrap();
}

#[tokio::test]
#[ignore]
#[serial]
async fn ownership_guard_walks_not_found_then_forbidden() {
    let services = services().await;
    let owner = publisher();
    let bootcamp = seed_bootcamp(&services, owner.id).await;

    let err = check_ownership(&services.bootcamps, Uuid::new_v4(), &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let stranger = publisher();
    let err = check_ownership(&services.bootcamps, bootcamp, &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let entity = check_ownership(&services.bootcamps, bootcamp, &owner)
        .await
        .unwrap();
    assert_eq!(entity.id, bootcamp);
}
