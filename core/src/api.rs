//! Typed endpoint functions over `ApiClient`.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::HomeData;

pub const HOME_PATH: &str = "/api/home";

/// Fetch the home page sections.
pub fn get_home_data(client: &ApiClient) -> Result<HomeData, ApiError> {
    client.get(HOME_PATH, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use serde_json::json;

    fn client(body: serde_json::Value) -> ApiClient {
        let transport = move |req: &HttpRequest| {
            assert_eq!(req.method, HttpMethod::Get);
            assert_eq!(req.url, "http://localhost:3000/api/home");
            Ok::<_, TransportError>(HttpResponse::new(200, body.to_string().into_bytes()))
        };
        ApiClient::new(ClientConfig::new("http://localhost:3000"), transport)
    }

    #[test]
    fn get_home_data_unwraps_envelope() {
        let client = client(json!({
            "code": 0,
            "data": {
                "swiper": [{"image": "/a.png", "title": "A"}],
                "projects": [],
                "lessons": [],
                "partners": [{"name": "Acme", "desc": "Tools"}],
            }
        }));
        let home = get_home_data(&client).unwrap();
        assert_eq!(home.swiper.len(), 1);
        assert_eq!(home.swiper[0].title.as_deref(), Some("A"));
        assert_eq!(home.partners[0].name, "Acme");
    }

    #[test]
    fn get_home_data_surfaces_application_errors() {
        let client = client(json!({"code": 1, "message": "not found"}));
        let err = get_home_data(&client).unwrap_err();
        assert_eq!(err.message(), "not found");
    }
}
