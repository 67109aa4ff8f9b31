//! Remote HTTP API calls
//!
//! Sends a request (body inline or fetched from a loader location, both
//! environment-rendered) and routes the response: to a file, to an
//! environment variable, or a single JSON field into an environment
//! variable for later steps.

use anyhow::{Context as _, Result, bail};
use manifest::Api;

use super::{Gates, Operator};
use crate::context::Context;
use crate::exec;
use crate::render::render_env;

impl Operator for Api {
    fn gates(&self) -> Gates<'_> {
        Gates {
            only_if: &self.only_if,
            not_if: &self.not_if,
            ..Gates::default()
        }
    }

    fn apply(&self, ctx: &Context) -> Result<()> {
        let endpoint = render_env(&self.endpoint, &ctx.facts);
        let output_file = render_env(&self.output_file, &ctx.facts);
        let method = if self.method.is_empty() {
            "GET".to_string()
        } else {
            self.method.to_uppercase()
        };
        let body = body_content(self, ctx)?;

        log::info!("API request: {method} {endpoint}");
        // ureq builders are typed by body-carrying capability, so each
        // method arm completes its own request
        let result = match method.as_str() {
            "GET" => with_headers(ureq::get(&endpoint), &self.headers).call(),
            "DELETE" => with_headers(ureq::delete(&endpoint), &self.headers).call(),
            "POST" => with_headers(ureq::post(&endpoint), &self.headers).send(&body[..]),
            "PUT" => with_headers(ureq::put(&endpoint), &self.headers).send(&body[..]),
            "PATCH" => with_headers(ureq::patch(&endpoint), &self.headers).send(&body[..]),
            other => bail!("unsupported API method: {other}"),
        };
        let mut response =
            result.with_context(|| format!("API request failed: {method} {endpoint}"))?;
        let data = response
            .body_mut()
            .read_to_vec()
            .context("failed to read API response body")?;
        let text = String::from_utf8_lossy(&data).into_owned();
        log::debug!("API response: {text}");

        if !output_file.is_empty() {
            let path = std::path::Path::new(&output_file);
            exec::make_parent_dirs(path)?;
            std::fs::write(path, &data)
                .with_context(|| format!("failed to write API output: {output_file}"))?;
            log::info!("API content saved to: {output_file}");
        }
        if !self.body_env.is_empty() {
            exec::set_process_env(&self.body_env, &text);
        }
        if !self.set_env.is_empty() && !self.json_key.is_empty() {
            let value = json_field(&text, &self.json_key)?;
            exec::set_process_env(&self.set_env, &value);
        }
        Ok(())
    }
}

/// Attach `Name: value` header lines to a request in either body state.
fn with_headers<B>(
    mut request: ureq::RequestBuilder<B>,
    headers: &[String],
) -> ureq::RequestBuilder<B> {
    for header in headers {
        if let Some((name, value)) = header.split_once(':') {
            request = request.header(name.trim(), value.trim());
        }
    }
    request
}

/// Resolve the request body: empty, inline text, or a fetchable location,
/// all environment-rendered.
fn body_content(op: &Api, ctx: &Context) -> Result<Vec<u8>> {
    if op.body.is_empty() {
        return Ok(Vec::new());
    }
    let raw = if is_location(&op.body) {
        let data = loader::read(&op.body)
            .with_context(|| format!("failed to load API body from: {}", op.body))?;
        String::from_utf8_lossy(&data).into_owned()
    } else {
        op.body.clone()
    };
    Ok(render_env(&raw, &ctx.facts).into_bytes())
}

fn is_location(body: &str) -> bool {
    ["file://", "http://", "https://", "s3://"]
        .iter()
        .any(|scheme| body.starts_with(scheme))
}

/// Look up a dotted key path in a JSON document; the value must be a string.
fn json_field(document: &str, key: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(document).context("API response is not valid JSON")?;
    let pointer = format!("/{}", key.replace('.', "/"));
    match value.pointer(&pointer) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(_) => bail!("value at {key} is not a string"),
        None => bail!("key not found in API response: {key}"),
    }
}
