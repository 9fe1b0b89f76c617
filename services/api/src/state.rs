//! Shared application state

use std::sync::Arc;

use common::store::DocumentStore;

use crate::config::AppConfig;
use crate::email::Mailer;
use crate::geocoder::Geocoder;
use crate::hooks::{BootcampHooks, CourseHooks, ReviewHooks};
use crate::jwt::JwtService;
use crate::models::bootcamp::Bootcamp;
use crate::models::course::Course;
use crate::models::review::Review;
use crate::models::user::User;
use crate::service::{CollectionService, NoHooks};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub jwt: JwtService,
    pub store: DocumentStore,
    pub mailer: Arc<dyn Mailer>,
    pub geocoder: Arc<dyn Geocoder>,
    pub bootcamps: CollectionService<Bootcamp>,
    pub courses: CollectionService<Course>,
    pub reviews: CollectionService<Review>,
    pub users: CollectionService<User>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        jwt: JwtService,
        store: DocumentStore,
        mailer: Arc<dyn Mailer>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let bootcamps = CollectionService::new(
            store.clone(),
            BootcampHooks {
                geocoder: Arc::clone(&geocoder),
            },
        );
        let courses = CollectionService::new(store.clone(), CourseHooks);
        let reviews = CollectionService::new(store.clone(), ReviewHooks);
        let users = CollectionService::new(store.clone(), NoHooks);

        AppState {
            config,
            jwt,
            store,
            mailer,
            geocoder,
            bootcamps,
            courses,
            reviews,
            users,
        }
    }
}
