diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        password_hash -> Text,
        full_name -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    ingredients (id) {
        id -> Integer,
        name -> Text,
        category -> Nullable<Text>,
        purchase_link -> Nullable<Text>,
        image_url -> Nullable<Text>,
    }
}

diesel::table! {
    tags (id) {
        id -> Integer,
        tag_name -> Text,
    }
}

diesel::table! {
    search_history (id) {
        id -> Integer,
        user_id -> Integer,
        search_query -> Text,
        searched_on -> Timestamp,
    }
}

diesel::table! {
    recipes (id) {
        id -> Integer,
        uploader_id -> Integer,
        title -> Text,
        instructions -> Text,
        cuisine -> Nullable<Text>,
        prep_time_mins -> Nullable<Integer>,
        calories -> Nullable<Integer>,
        approval_status -> Text,
    }
}

diesel::table! {
    recipe_ingredients (id) {
        id -> Integer,
        recipe_id -> Integer,
        ingredient_id -> Integer,
        quantity_required -> Text,
        unit -> Text,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    recipe_tags (id) {
        id -> Integer,
        recipe_id -> Integer,
        tag_id -> Integer,
    }
}

diesel::table! {
    user_pantry (id) {
        id -> Integer,
        user_id -> Integer,
        ingredient_id -> Integer,
        quantity -> Text,
        unit -> Text,
    }
}

diesel::table! {
    reviews (id) {
        id -> Integer,
        recipe_id -> Integer,
        user_id -> Integer,
        rating -> Integer,
        comment -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::joinable!(search_history -> users (user_id));
diesel::joinable!(recipes -> users (uploader_id));
diesel::joinable!(recipe_ingredients -> recipes (recipe_id));
diesel::joinable!(recipe_ingredients -> ingredients (ingredient_id));
diesel::joinable!(recipe_tags -> recipes (recipe_id));
diesel::joinable!(recipe_tags -> tags (tag_id));
diesel::joinable!(user_pantry -> users (user_id));
diesel::joinable!(user_pantry -> ingredients (ingredient_id));
diesel::joinable!(reviews -> recipes (recipe_id));
diesel::joinable!(reviews -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    ingredients,
    tags,
    search_history,
    recipes,
    recipe_ingredients,
    recipe_tags,
    user_pantry,
    reviews,
);
