use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// One HTTP route. `{id}` in the path is replaced by the record key; routes
/// that take the key in the body name the field with `id_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: &'static str,
    pub id_field: Option<&'static str>,
}

impl Route {
    pub fn new(method: Method, path: &'static str) -> Self {
        Route {
            method,
            path,
            id_field: None,
        }
    }

    pub fn with_id_field(mut self, field: &'static str) -> Self {
        self.id_field = Some(field);
        self
    }

    pub fn path_for(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => self.path.replace("{id}", id),
            None => self.path.to_string(),
        }
    }

    /// The JSON body to send, with the key injected when `id_field` is set.
    pub fn body_for(&self, id: Option<&str>, body: Option<&Value>) -> Option<Value> {
        match (self.id_field, id) {
            (Some(field), Some(id)) => {
                let mut object = match body {
                    Some(Value::Object(object)) => object.clone(),
                    _ => Map::new(),
                };
                object.insert(field.to_string(), Value::String(id.to_string()));
                Some(Value::Object(object))
            }
            _ => body.cloned(),
        }
    }
}

/// The REST surface of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub list: Route,
    /// Envelope key holding the list; `None` for a bare array body.
    pub list_key: Option<&'static str>,
    /// Envelope key holding a single record in write responses.
    pub item_key: Option<&'static str>,
    pub create: Option<Route>,
    pub update: Option<Route>,
    pub delete: Option<Route>,
}
