//! Diesel table definitions for the application portfolio.
//!
//! Tables: applications, capabilities, application_capabilities,
//! integrations, tech_debt_items.

diesel::table! {
    applications (id) {
        id -> Int8,
        name -> Varchar,
        domain -> Varchar,
        criticality -> Varchar,
        lifecycle -> Varchar,
        environment -> Varchar,
        region -> Varchar,
        hosting -> Varchar,
        business_owner -> Varchar,
        it_owner -> Varchar,
        vendor -> Varchar,
        tech_stack -> Text,
        runtime -> Varchar,
        database_technology -> Varchar,
        vendor_products -> Text,
        data_sensitivity -> Varchar,
        tech_debt_score -> Int4,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    capabilities (id) {
        id -> Int8,
        name -> Varchar,
        description -> Text,
    }
}

diesel::table! {
    application_capabilities (application_id, capability_id) {
        application_id -> Int8,
        capability_id -> Int8,
    }
}

diesel::table! {
    integrations (id) {
        id -> Int8,
        source_app_id -> Int8,
        target_app_id -> Int8,
        integration_type -> Varchar,
        direction -> Varchar,
        daily_volume -> Int8,
        data_sensitivity -> Varchar,
        transport -> Varchar,
        frequency -> Varchar,
        interface_name -> Varchar,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    tech_debt_items (id) {
        id -> Int8,
        application_id -> Int8,
        category -> Varchar,
        severity -> Varchar,
        status -> Varchar,
        title -> Varchar,
        description -> Text,
        created_at -> Timestamptz,
        target_date -> Nullable<Date>,
    }
}

// Foreign key relationships
diesel::joinable!(application_capabilities -> applications (application_id));
diesel::joinable!(application_capabilities -> capabilities (capability_id));
diesel::joinable!(tech_debt_items -> applications (application_id));

diesel::allow_tables_to_appear_in_same_query!(
    applications,
    capabilities,
    application_capabilities,
    integrations,
    tech_debt_items,
);
