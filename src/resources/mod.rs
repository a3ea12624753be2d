pub mod schema;

pub use schema::{FieldErrors, FieldSpec, FieldType, FieldUpdate, FieldValue, Patch, ResourceSchema};

const TOTAL: FieldSpec = FieldSpec::number("total");
const CATEGORY: FieldSpec = FieldSpec::text("category");
const PLACE: FieldSpec = FieldSpec::text("place");
const NAME: FieldSpec = FieldSpec::text("name");

pub static BILLS: ResourceSchema = ResourceSchema {
    kind: "bills",
    label: "Bill",
    collection: "bills",
    fields: &[TOTAL, CATEGORY, PLACE],
    scoped: true,
};

pub static BUDGETS: ResourceSchema = ResourceSchema {
    kind: "budgets",
    label: "Budget",
    collection: "budgets",
    fields: &[TOTAL, CATEGORY, NAME],
    scoped: true,
};

pub static EXPENSES: ResourceSchema = ResourceSchema {
    kind: "expenses",
    label: "Expense",
    collection: "expenses",
    fields: &[TOTAL, CATEGORY, PLACE],
    scoped: true,
};

pub static WISHLISTS: ResourceSchema = ResourceSchema {
    kind: "wishlists",
    label: "Wishlist",
    collection: "wishlists",
    fields: &[TOTAL, CATEGORY, NAME],
    scoped: true,
};

/// Every resource kind served under /v1
pub static ALL: [&ResourceSchema; 4] = [&BILLS, &BUDGETS, &EXPENSES, &WISHLISTS];
