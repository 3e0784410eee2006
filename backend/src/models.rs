use diesel::prelude::*;

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AddAccount {
    pub account_id: String,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::replays)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Replay {
    pub id: String,
    pub account_id: String,
    pub stored_path: String,
    pub original_name: String,
    pub processed: bool,
    pub data: Option<serde_json::Value>,
    pub uploaded_at: chrono::NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::replays)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AddReplay {
    pub id: String,
    pub account_id: String,
    pub stored_path: String,
    pub original_name: String,
}

impl TryFrom<Replay> for common::ReplayFile {
    type Error = serde_json::Error;

    fn try_from(value: Replay) -> Result<Self, Self::Error> {
        let data = value.data.map(serde_json::from_value).transpose()?;

        Ok(Self {
            id: value.id,
            stored_path: value.stored_path,
            original_name: value.original_name,
            processed: value.processed,
            data,
        })
    }
}
