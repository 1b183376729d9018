//! Provider/model loader. Fetches the provider and model lists and folds them
//! into the page's selects.
//!
//! A failed fetch is logged and leaves the page as it was; there is no retry.

use tracing::{debug, info, instrument, warn};

use crate::backend::Backend;
use crate::domain::ModelEntry;
use crate::error::Result;
use crate::page::Page;

/// One provider's models as fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelsSnapshot {
  pub provider: String,
  pub models: Vec<ModelEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogSnapshot {
  pub providers: Vec<String>,
  pub selected: ModelsSnapshot,
}

/// Provider list, then the models of `wanted` (or of the first provider when
/// `wanted` is not offered).
#[instrument(level = "info", skip(backend))]
pub async fn fetch_catalog(backend: &Backend, wanted: Option<&str>) -> Result<CatalogSnapshot> {
  let providers = backend.providers().await?;
  let provider = match wanted {
    Some(w) if providers.iter().any(|p| p == w) => w.to_string(),
    _ => providers.first().cloned().unwrap_or_default(),
  };
  let selected = fetch_models(backend, &provider).await?;
  info!(target: "catalog", providers = providers.len(), %provider, models = selected.models.len(), "Catalog loaded");
  Ok(CatalogSnapshot { providers, selected })
}

pub async fn fetch_models(backend: &Backend, provider: &str) -> Result<ModelsSnapshot> {
  let models = if provider.is_empty() { Vec::new() } else { backend.models(provider).await? };
  Ok(ModelsSnapshot { provider: provider.to_string(), models })
}

/// Keep `previous` if it is still offered, else take the first model.
pub fn pick_model(models: &[ModelEntry], previous: &str) -> String {
  if !previous.is_empty() && models.iter().any(|m| m.id == previous) {
    return previous.to_string();
  }
  models.first().map(|m| m.id.clone()).unwrap_or_default()
}

pub fn apply_models(page: &mut Page, snap: ModelsSnapshot) {
  let model = pick_model(&snap.models, &page.form.model);
  if model != page.form.model || snap.provider != page.form.provider {
    page.model_description = None;
  }
  page.catalog.models.insert(snap.provider.clone(), snap.models);
  page.form.provider = snap.provider;
  page.form.model = model;
}

pub fn apply_catalog(page: &mut Page, snap: CatalogSnapshot) {
  page.catalog.providers = snap.providers;
  let listed = &page.catalog.providers;
  page.catalog.models.retain(|p, _| listed.contains(p));
  apply_models(page, snap.selected);
}

/// Models for the validation override. The chosen model is kept when the new
/// provider still offers it.
pub fn apply_validation_models(page: &mut Page, snap: ModelsSnapshot) {
  if let Some(o) = page.form.validation_override.as_mut() {
    o.model = pick_model(&snap.models, &o.model);
  }
  if !snap.provider.is_empty() {
    page.catalog.models.insert(snap.provider, snap.models);
  }
}

/// Apply a fetch result; on failure warn and keep the page unchanged.
pub fn settle<T>(page: &mut Page, res: Result<T>, apply: impl FnOnce(&mut Page, T)) {
  match res {
    Ok(snap) => apply(page, snap),
    Err(e) => warn!(target: "catalog", error = %e, "Catalog fetch failed; keeping previous selection"),
  }
}

/// Tooltip text for a model. Best-effort: any failure means no tooltip.
pub async fn describe(backend: &Backend, provider: &str, model: &str) -> Option<String> {
  if provider.is_empty() || model.is_empty() {
    return None;
  }
  match backend.model_description(provider, model).await {
    Ok(d) => d,
    Err(e) => {
      debug!(target: "catalog", %provider, %model, error = %e, "No model description");
      None
    }
  }
}
