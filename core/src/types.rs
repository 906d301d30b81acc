//! Domain DTOs for the portal API.
//!
//! # Design
//! These types mirror the mock-server's payloads but are defined
//! independently; integration tests catch any schema drift between the two
//! crates. JSON field names are camelCase to match the backend.

use serde::{Deserialize, Serialize};

/// A carousel slide on the home page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwiperItem {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub sub_title: String,
    pub url: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub title: String,
    pub sub_title: String,
    pub url: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Partner {
    pub name: String,
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Everything the home page renders, as returned by `GET /api/home`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HomeData {
    #[serde(default)]
    pub swiper: Vec<SwiperItem>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub partners: Vec<Partner>,
}
