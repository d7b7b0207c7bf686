diesel::table! {
    todos (id) {
        id -> Integer,
        title -> Text,
        completed -> Bool,
    }
}
