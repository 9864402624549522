//! Discovery orchestration
//!
//! Reconciles the three metadata sources into one catalog: the Metadata
//! API column listing, the cube compatibility dataset, and the
//! per-property custom field listings.

use crate::catalog::{generate_catalog, premade_reports, Catalog, ReportSpec, ResolvedField};
use crate::client::AnalyticsApi;
use crate::config::Config;
use crate::cubes::{custom_field_exclusions, CubesLookup};
use crate::error::{Error, Result};
use crate::expand::{classify, expand_dynamic, expand_static, Placeholder};
use crate::fields::{
    merge_custom_fields, normalize_custom_fields, normalize_standard_fields, FieldDescriptor,
    FieldScope,
};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Run discovery over every configured view and produce the catalog
pub async fn discover<C: AnalyticsApi + ?Sized>(client: &C, config: &Config) -> Result<Catalog> {
    let view_ids = config.view_ids();

    info!("Discovering standard fields...");
    let columns = client.field_metadata().await?;
    let standard_fields = normalize_standard_fields(&columns)?;

    info!("Parsing cube definitions...");
    let lookup = CubesLookup::from_raw(&client.raw_cubes().await?);

    info!("Discovering custom fields...");
    let custom_fields = collect_custom_fields(client, &view_ids).await?;
    let goal_ids = collect_goal_ids(client, &view_ids).await;

    info!("Generating catalog...");
    let resolved = resolve_fields(&standard_fields, &custom_fields, &lookup, &goal_ids)?;

    let mut specs: Vec<ReportSpec> = config
        .report_definitions
        .iter()
        .map(ReportSpec::custom)
        .collect();
    specs.extend(premade_reports());

    Ok(generate_catalog(&specs, &resolved, lookup.all_cubes()))
}

/// Properties owning the configured views, without duplicates
fn properties_for<C: AnalyticsApi + ?Sized>(
    client: &C,
    view_ids: &[String],
) -> Result<Vec<(String, String)>> {
    let mut properties = Vec::new();
    for view_id in view_ids {
        let info = client.profile_info(view_id).ok_or_else(|| {
            Error::discovery(format!("view id {view_id} is not resolvable"))
        })?;
        let key = (info.account_id.clone(), info.web_property_id.clone());
        if !properties.contains(&key) {
            properties.push(key);
        }
    }
    Ok(properties)
}

/// List and merge custom fields across every property the configured
/// views live under. A permission error on one property skips just that
/// property's custom fields.
async fn collect_custom_fields<C: AnalyticsApi + ?Sized>(
    client: &C,
    view_ids: &[String],
) -> Result<Vec<FieldDescriptor>> {
    let mut all = Vec::new();
    for (account_id, web_property_id) in properties_for(client, view_ids)? {
        let dimensions = client.custom_dimensions(&account_id, &web_property_id).await;
        let metrics = client.custom_metrics(&account_id, &web_property_id).await;
        let items = match (dimensions, metrics) {
            (Ok(mut dims), Ok(mets)) => {
                dims.extend(mets);
                dims
            }
            (Err(e), _) | (_, Err(e)) if e.is_permission_denied() => {
                warn!(
                    "No access to custom fields for property {web_property_id}, skipping: {e}"
                );
                continue;
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };
        all.extend(normalize_custom_fields(&account_id, &items)?);
    }
    Ok(merge_custom_fields(all))
}

/// Goal numbers unioned across the configured views, sorted and deduped.
/// Enumeration failures degrade to an empty contribution.
async fn collect_goal_ids<C: AnalyticsApi + ?Sized>(client: &C, view_ids: &[String]) -> Vec<String> {
    let mut goals = BTreeSet::new();
    for view_id in view_ids {
        let Some(info) = client.profile_info(view_id) else {
            continue;
        };
        match client
            .goal_ids(&info.account_id, &info.web_property_id, view_id)
            .await
        {
            Ok(ids) => goals.extend(ids),
            Err(e) => warn!("Could not list goals for view {view_id}, skipping: {e}"),
        }
    }
    goals.into_iter().collect()
}

/// Expand placeholders and attach compatibility annotations. Deprecated
/// standard fields and the custom field slots are dropped; the slots are
/// re-filled by the concrete custom fields discovered per property.
fn resolve_fields(
    standard_fields: &[FieldDescriptor],
    custom_fields: &[FieldDescriptor],
    lookup: &CubesLookup,
    goal_ids: &[String],
) -> Result<Vec<ResolvedField>> {
    let mut resolved = Vec::new();

    for field in standard_fields {
        if field.deprecated {
            continue;
        }
        match classify(&field.id, lookup) {
            None => resolved.push(ResolvedField::standard(
                field.clone(),
                lookup.cubes_for(&field.id).cloned(),
            )),
            Some(Placeholder::Static) => {
                for expanded in expand_static(field, lookup)? {
                    let cubes = lookup.cubes_for(&expanded.id).cloned();
                    resolved.push(ResolvedField::standard(expanded, cubes));
                }
            }
            Some(Placeholder::Dynamic) => {
                // Every expansion inherits the placeholder form's cubes
                let cubes = lookup.cubes_for(&field.id).cloned();
                for expanded in expand_dynamic(field, goal_ids) {
                    resolved.push(ResolvedField::standard(expanded, cubes.clone()));
                }
            }
            Some(Placeholder::CustomSlot) => {}
        }
    }

    let accounts_with_custom_fields: BTreeSet<String> = custom_fields
        .iter()
        .flat_map(FieldDescriptor::accounts)
        .collect();

    for field in custom_fields {
        let slot = match &field.scope {
            FieldScope::Custom { .. } => custom_slot_for(field),
            FieldScope::Standard => {
                return Err(Error::discovery(format!(
                    "custom field {} has no account scope",
                    field.id
                )))
            }
        };
        resolved.push(ResolvedField {
            cubes: lookup.cubes_for(slot).cloned(),
            unsupported_accounts: custom_field_exclusions(
                &accounts_with_custom_fields,
                &field.accounts(),
            ),
            field: field.clone(),
        });
    }

    Ok(resolved)
}

/// The placeholder slot whose cubes a custom field inherits
fn custom_slot_for(field: &FieldDescriptor) -> &'static str {
    match field.category {
        crate::fields::FieldCategory::Metric => "ga:metricXX",
        crate::fields::FieldCategory::Dimension => "ga:dimensionXX",
    }
}
