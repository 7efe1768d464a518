use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ledgerline_core::{Customer, Project, Supplier, SupplierDraft};
use ledgerline_platform::SupplierQuery;
use sqlx::{Row, postgres::PgRow};
use tracing::info;

use crate::{ApiError, AppState, internal_error, invalid_request, not_found, search_pattern};

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_person, email, phone, address, tax_number, is_archived";

/// Active suppliers by default; `includeArchived` lists every one.
pub(crate) async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<SupplierQuery>,
) -> Result<Json<Vec<Supplier>>, ApiError> {
    let sql = format!(
        r#"
        SELECT {SUPPLIER_COLUMNS}
        FROM suppliers
        WHERE ($1 OR NOT is_archived)
          AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2 OR contact_person ILIKE $2)
        ORDER BY name
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(query.include_archived)
        .bind(search_pattern(query.search.as_deref()))
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let suppliers = rows
        .iter()
        .map(supplier_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(suppliers))
}

pub(crate) async fn create_supplier(
    State(state): State<AppState>,
    Json(supplier): Json<SupplierDraft>,
) -> Result<(StatusCode, Json<Supplier>), ApiError> {
    let name = checked_name(&supplier)?;

    let sql = format!(
        r#"
        INSERT INTO suppliers (name, contact_person, email, phone, address, tax_number)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {SUPPLIER_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.tax_number)
        .fetch_one(&state.pool)
        .await
        .map_err(internal_error)?;

    let created = supplier_from_row(&row)?;
    info!("supplier {} created", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(supplier): Json<SupplierDraft>,
) -> Result<Json<Supplier>, ApiError> {
    let name = checked_name(&supplier)?;

    let sql = format!(
        r#"
        UPDATE suppliers
        SET name = $2, contact_person = $3, email = $4, phone = $5, address = $6,
            tax_number = $7, updated_at = NOW()
        WHERE id = $1
        RETURNING {SUPPLIER_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.tax_number)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("supplier"))?;

    Ok(Json(supplier_from_row(&row)?))
}

pub(crate) async fn archive_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Supplier>, ApiError> {
    set_archived(&state, id, true).await
}

pub(crate) async fn unarchive_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Supplier>, ApiError> {
    set_archived(&state, id, false).await
}

pub(crate) async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let rows = sqlx::query("SELECT id, name, email FROM customers ORDER BY name")
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let mut customers = Vec::with_capacity(rows.len());
    for row in rows {
        customers.push(Customer {
            id: row.try_get("id").map_err(internal_error)?,
            name: row.try_get("name").map_err(internal_error)?,
            email: row.try_get("email").map_err(internal_error)?,
        });
    }
    Ok(Json(customers))
}

pub(crate) async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let rows = sqlx::query("SELECT id, title, customer_id, budget FROM projects ORDER BY title")
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in rows {
        projects.push(Project {
            id: row.try_get("id").map_err(internal_error)?,
            title: row.try_get("title").map_err(internal_error)?,
            customer_id: row.try_get("customer_id").map_err(internal_error)?,
            budget: row.try_get("budget").map_err(internal_error)?,
        });
    }
    Ok(Json(projects))
}

async fn set_archived(state: &AppState, id: i64, archived: bool) -> Result<Json<Supplier>, ApiError> {
    let sql = format!(
        r#"
        UPDATE suppliers
        SET is_archived = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {SUPPLIER_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(archived)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("supplier"))?;

    info!(
        "supplier {} {}",
        id,
        if archived { "archived" } else { "restored" }
    );
    Ok(Json(supplier_from_row(&row)?))
}

fn checked_name(supplier: &SupplierDraft) -> Result<&str, ApiError> {
    let name = supplier.name.trim();
    if name.is_empty() {
        return Err(invalid_request("Name is required"));
    }
    Ok(name)
}

fn supplier_from_row(row: &PgRow) -> Result<Supplier, ApiError> {
    Ok(Supplier {
        id: row.try_get("id").map_err(internal_error)?,
        supplier: SupplierDraft {
            name: row.try_get("name").map_err(internal_error)?,
            contact_person: row.try_get("contact_person").map_err(internal_error)?,
            email: row.try_get("email").map_err(internal_error)?,
            phone: row.try_get("phone").map_err(internal_error)?,
            address: row.try_get("address").map_err(internal_error)?,
            tax_number: row.try_get("tax_number").map_err(internal_error)?,
        },
        is_archived: row.try_get("is_archived").map_err(internal_error)?,
    })
}
