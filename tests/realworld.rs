//! API client generated from endpoint descriptions
//!
//! Exercises every directive kind together: loops over object entries,
//! pattern entries and function declarations, transformations that replace,
//! rename or prune, and member-property renames.

use asttpl::parser::{Expr, ObjectMember, Prop};
use asttpl::template::BoxError;
use asttpl::{compile_with_config, CompileConfig, ContextStack, Flow, NodeHandle};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const TEMPLATE: &str = r#"import qs from 'qs';
import angular from 'angular';
const HTTP_METHODS = {
  options: 'OPTIONS',
  head: 'HEAD',
  get: 'GET',
  post: 'POST',
  put: 'PUT',
  patch: 'PATCH',
  delete: 'DELETE'
};

angular.module('app').service('API', apiService);

apiService.$inject = ['ENV', '$http'];

function apiService(ENV, $http) {
  const API = {
    𐅙repeat𐅙endpoints𐅞𐅅𐅙operationId
  };

  return API;

  function 𐅙repeat𐅙endpoints𐅞𐅅𐅙operationId ({
    𐅙repeat𐅙parameters𐅞𐅅𐅙name
  }) {
    const urlParts = [ENV.apiEndpoint].concat(𐅙transform𐅙buildPath𐅙path);
    const query = 𐅙transform𐅙buildQueryParameters𐅙parameters;
    const headers = {};
    let data = 𐅙transform𐅙buildData𐅙parameters;
    let apiToken = 𐅙transform𐅙takeToken𐅙parameters;

    if(data) {
      headers['Content-Type'] = 'application/json';
    }

    if(apiToken) {
      headers['Authorization'] = 'Bearer ' + apiToken;
    }

    const req = {
       method: HTTP_METHODS.𐅙variable𐅙method,
       url: urlParts.join('') + '?' + qs.stringify(query),
       headers,
       data
     };
     return $http(req);
  }
}"#;

const EXPECTED_EMPTY: &str = r#"import qs from 'qs';
import angular from 'angular';

const HTTP_METHODS = {
  options: 'OPTIONS',
  head: 'HEAD',
  get: 'GET',
  post: 'POST',
  put: 'PUT',
  patch: 'PATCH',
  delete: 'DELETE'
};

angular.module('app').service('API', apiService);
apiService.$inject = ['ENV', '$http'];

function apiService(ENV, $http) {
  const API = {};
  return API;
}"#;

const EXPECTED_FULL: &str = r#"import qs from 'qs';
import angular from 'angular';

const HTTP_METHODS = {
  options: 'OPTIONS',
  head: 'HEAD',
  get: 'GET',
  post: 'POST',
  put: 'PUT',
  patch: 'PATCH',
  delete: 'DELETE'
};

angular.module('app').service('API', apiService);
apiService.$inject = ['ENV', '$http'];

function apiService(ENV, $http) {
  const API = {
    getAlbums,
    putArticle
  };

  return API;

  function getAlbums(
    {
      token,
      access_token,
      Authorization,
      limit,
      offset,
      territory,
      term
    }
  ) {
    const urlParts = [ENV.apiEndpoint].concat(['/search/albums']);

    const query = {
      token,
      access_token,
      limit,
      offset,
      territory,
      term
    };

    const headers = {};
    let data;
    let apiToken = Authorization;

    if (data) {
      headers['Content-Type'] = 'application/json';
    }

    if (apiToken) {
      headers['Authorization'] = 'Bearer ' + apiToken;
    }

    const req = {
      method: HTTP_METHODS.get,
      url: urlParts.join('') + '?' + qs.stringify(query),
      headers,
      data
    };

    return $http(req);
  }

  function putArticle(
    {
      token,
      access_token,
      body,
      Authorization,
      articleId
    }
  ) {
    const urlParts = [ENV.apiEndpoint].concat(['/articles/', articleId, '']);

    const query = {
      token,
      access_token
    };

    const headers = {};
    let data = body;
    let apiToken = Authorization;

    if (data) {
      headers['Content-Type'] = 'application/json';
    }

    if (apiToken) {
      headers['Authorization'] = 'Bearer ' + apiToken;
    }

    const req = {
      method: HTTP_METHODS.get,
      url: urlParts.join('') + '?' + qs.stringify(query),
      headers,
      data
    };

    return $http(req);
  }
}"#;

/// `/articles/{articleId}` into `['/articles/', articleId, '']`
fn build_path(handle: &mut NodeHandle, values: &[Value]) -> Result<Flow, BoxError> {
    let path = values
        .first()
        .and_then(Value::as_str)
        .ok_or("buildPath expects a path string")?;

    let mut elements = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let end = rest[start..]
            .find('}')
            .map(|offset| start + offset)
            .ok_or("unclosed path parameter")?;
        elements.push(Expr::string(&rest[..start]));
        elements.push(Expr::ident(&rest[start + 1..end]));
        rest = &rest[end + 1..];
    }
    elements.push(Expr::string(rest));

    handle.replace(Expr::Array(elements));
    Ok(Flow::Continue)
}

fn parameters(values: &[Value]) -> Vec<&Value> {
    values
        .last()
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

fn field<'v>(parameter: &'v Value, key: &str) -> Option<&'v str> {
    parameter.get(key).and_then(Value::as_str)
}

/// Rename to a parameter's name, or drop the node when there is none
fn rename_or_prune(handle: &mut NodeHandle, name: Option<&str>) -> Result<Flow, BoxError> {
    match name {
        Some(name) => {
            if let Some(ident) = handle.ident_mut() {
                ident.name = name.to_string();
            }
            Ok(Flow::Continue)
        }
        None => {
            handle.prune();
            Ok(Flow::StopRecursion)
        }
    }
}

fn build_data(handle: &mut NodeHandle, values: &[Value]) -> Result<Flow, BoxError> {
    let body = parameters(values)
        .into_iter()
        .find(|parameter| field(parameter, "in") == Some("body"))
        .and_then(|parameter| field(parameter, "name"));
    rename_or_prune(handle, body)
}

fn take_token(handle: &mut NodeHandle, values: &[Value]) -> Result<Flow, BoxError> {
    let token = parameters(values)
        .into_iter()
        .filter(|parameter| field(parameter, "in") == Some("header"))
        .find(|parameter| field(parameter, "name") == Some("Authorization"))
        .and_then(|parameter| field(parameter, "name"));
    rename_or_prune(handle, token)
}

fn build_query_parameters(handle: &mut NodeHandle, values: &[Value]) -> Result<Flow, BoxError> {
    let members = parameters(values)
        .into_iter()
        .filter(|parameter| field(parameter, "in") == Some("query"))
        .filter_map(|parameter| field(parameter, "name"))
        .map(|name| ObjectMember::Prop(Prop::shorthand(name)))
        .collect();
    handle.replace(Expr::Object(members));
    Ok(Flow::Continue)
}

fn config() -> CompileConfig {
    CompileConfig::new()
        .with_transformation("buildPath", build_path)
        .with_transformation("buildData", build_data)
        .with_transformation("takeToken", take_token)
        .with_transformation("buildQueryParameters", build_query_parameters)
}

fn endpoints() -> Value {
    json!([{
        "method": "get",
        "path": "/search/albums",
        "tags": ["albums"],
        "description": "Returns albums containing a given term.",
        "operationId": "getAlbums",
        "consumes": [],
        "produces": ["application/json"],
        "parameters": [
            {
                "name": "token",
                "description": "Deprecated way to set the token",
                "type": "string",
                "in": "query"
            },
            {
                "name": "access_token",
                "description": "Brand new way to set the token in the query string (standard too)",
                "type": "string",
                "in": "query"
            },
            {
                "in": "header",
                "name": "Authorization",
                "description": "Bearer authorization header"
            },
            { "name": "limit", "type": "number", "required": false, "in": "query" },
            { "name": "offset", "type": "number", "required": false, "in": "query" },
            { "name": "territory", "type": "string", "required": false, "in": "query" },
            { "name": "term", "type": "string", "required": false, "in": "query" }
        ]
    }, {
        "method": "get",
        "path": "/articles/{articleId}",
        "tags": ["articles"],
        "deprecated": false,
        "description": "Update an article.",
        "operationId": "putArticle",
        "consumes": ["application/json"],
        "produces": ["application/json"],
        "parameters": [
            {
                "name": "token",
                "description": "Deprecated way to set the token",
                "type": "string",
                "in": "query"
            },
            {
                "name": "access_token",
                "description": "Brand new way to set the token in the query string (standard too)",
                "type": "string",
                "in": "query"
            },
            {
                "in": "body",
                "name": "body",
                "schema": { "title": "Article", "type": "object", "additionalProperties": false },
                "required": true
            },
            {
                "in": "header",
                "name": "Authorization",
                "description": "Bearer authorization header"
            },
            { "name": "articleId", "type": "number", "required": true, "in": "path" }
        ]
    }])
}

#[test]
fn test_real_template_without_values() {
    let mut stack = ContextStack::new();
    let output = compile_with_config(TEMPLATE, &mut stack, &config()).unwrap();
    assert_eq!(output, EXPECTED_EMPTY);
}

#[test]
fn test_real_template_with_endpoints() {
    let mut stack = ContextStack::from(vec![json!({ "endpoints": endpoints() })]);
    let output = compile_with_config(TEMPLATE, &mut stack, &config()).unwrap();
    assert_eq!(output, EXPECTED_FULL);
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_missing_transformation_is_reported() {
    let mut stack = ContextStack::from(vec![json!({ "endpoints": endpoints() })]);
    let config = CompileConfig::new().with_transformation("buildPath", build_path);
    let err = compile_with_config(TEMPLATE, &mut stack, &config).unwrap_err();
    assert_eq!(err.code(), "E_BAD_TRANSFORMATION");
}
