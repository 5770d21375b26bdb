use serde::Deserialize;

use crate::error::PipelineError;

/// Wire shape of the source API payload. Only the fields the pipeline
/// projects are modeled; everything else in the body is ignored.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub results: Vec<ApiUser>,
}

#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub name: ApiName,
    pub location: ApiLocation,
    pub login: ApiLogin,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiName {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiLocation {
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiLogin {
    pub username: String,
    pub password: String,
}

/// Delimiter of the transfer buffer. The bulk load is positional, so a
/// value containing this character is rejected rather than escaped.
pub const DELIMITER: char = ',';

/// One flat row bound for the `users` table. Field order is load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub firstname: String,
    pub lastname: String,
    pub country: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl UserRow {
    /// Project the first record of a decoded API payload into a row.
    ///
    /// Extra records are ignored; the pipeline loads one record per run.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, PipelineError> {
        let decoded: ApiResponse = serde_json::from_value(payload).map_err(|e| {
            PipelineError::MalformedResponse(format!("unexpected payload shape: {e}"))
        })?;
        let user = decoded
            .results
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::MalformedResponse("results is empty".into()))?;
        Ok(Self {
            firstname: user.name.first,
            lastname: user.name.last,
            country: user.location.country,
            username: user.login.username,
            password: user.login.password,
            email: user.email,
        })
    }

    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("firstname", &self.firstname),
            ("lastname", &self.lastname),
            ("country", &self.country),
            ("username", &self.username),
            ("password", &self.password),
            ("email", &self.email),
        ]
    }

    /// Serialize to one delimited line, no header, no trailing newline.
    pub fn encode(&self) -> Result<String, PipelineError> {
        let fields = self.fields();
        for (column, value) in &fields {
            if value.is_empty() {
                return Err(PipelineError::DataIntegrity(format!("{column} is empty")));
            }
            if value.contains(DELIMITER) {
                return Err(PipelineError::DataIntegrity(format!(
                    "{column} contains the delimiter: {value:?}"
                )));
            }
        }
        let values: Vec<&str> = fields.iter().map(|(_, value)| *value).collect();
        Ok(values.join(","))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_payload() -> serde_json::Value {
        json!({
            "results": [{
                "name": {"first": "Jane", "last": "Doe"},
                "location": {"country": "US"},
                "login": {"username": "jdoe", "password": "x1"},
                "email": "jane@example.com"
            }]
        })
    }

    #[test]
    fn projects_first_record_in_field_order() {
        let row = UserRow::from_payload(sample_payload()).expect("payload is well formed");
        assert_eq!(row.firstname, "Jane");
        assert_eq!(row.lastname, "Doe");
        assert_eq!(row.country, "US");
        assert_eq!(row.username, "jdoe");
        assert_eq!(row.password, "x1");
        assert_eq!(row.email, "jane@example.com");
        assert_eq!(
            row.encode().expect("row is clean"),
            "Jane,Doe,US,jdoe,x1,jane@example.com"
        );
    }

    #[test]
    fn extra_records_are_ignored() {
        let mut payload = sample_payload();
        let second = json!({
            "name": {"first": "Max", "last": "Mustermann"},
            "location": {"country": "DE"},
            "login": {"username": "maxm", "password": "pw"},
            "email": "max@example.com"
        });
        payload["results"]
            .as_array_mut()
            .expect("results is an array")
            .push(second);

        let row = UserRow::from_payload(payload).expect("payload is well formed");
        assert_eq!(row.firstname, "Jane", "only the first record is used");
    }

    #[test]
    fn empty_results_is_malformed() {
        let err = UserRow::from_payload(json!({"results": []})).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)), "got: {err:?}");
        assert!(err.to_string().contains("results is empty"));
    }

    #[test]
    fn missing_nested_field_is_malformed() {
        let mut payload = sample_payload();
        payload["results"][0]["login"]
            .as_object_mut()
            .expect("login is an object")
            .remove("password");

        let err = UserRow::from_payload(payload).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)), "got: {err:?}");
    }

    #[test]
    fn empty_field_value_is_rejected() {
        let mut payload = sample_payload();
        payload["results"][0]["location"]["country"] = json!("");
        let row = UserRow::from_payload(payload).expect("shape is still valid");
        let err = row.encode().unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity(_)), "got: {err:?}");
        assert!(err.to_string().contains("country"));
    }

    #[test]
    fn delimiter_in_field_value_is_rejected() {
        let mut payload = sample_payload();
        payload["results"][0]["location"]["country"] = json!("Bonaire, Sint Eustatius and Saba");
        let row = UserRow::from_payload(payload).expect("shape is still valid");
        let err = row.encode().unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity(_)), "got: {err:?}");
    }
}
