use chrono::{
  DateTime,
  NaiveDate
};

/// Parses a due date as the board API sends
/// it: either a bare `YYYY-MM-DD` or a full
/// RFC 3339 timestamp, of which only the
/// calendar date is kept.
pub fn parse_due_date(
  raw: &str
) -> Option<NaiveDate> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      trimmed, "%Y-%m-%d"
    )
  {
    return Some(date);
  }

  DateTime::parse_from_rfc3339(trimmed)
    .ok()
    .map(|dt| dt.date_naive())
}

/// `Jan 5`, as shown on task cards.
pub fn format_card_date(
  date: NaiveDate
) -> String {
  date.format("%b %-d").to_string()
}

/// `Jan 5, 2025`, as shown on project cards.
pub fn format_project_date(
  date: NaiveDate
) -> String {
  date.format("%b %-d, %Y").to_string()
}

pub mod due_date_serde {
  pub mod option {
    use chrono::NaiveDate;
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    use crate::dates::parse_due_date;

    pub fn serialize<S>(
      date: &Option<NaiveDate>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match date {
        | Some(value) => {
          serializer.serialize_str(
            &value
              .format("%Y-%m-%d")
              .to_string()
          )
        }
        | None => serializer.serialize_none()
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<Option<NaiveDate>, D::Error>
    where
      D: Deserializer<'de>
    {
      let raw =
        Option::<String>::deserialize(
          deserializer
        )?;
      match raw {
        | None => Ok(None),
        | Some(text)
          if text.trim().is_empty() =>
        {
          Ok(None)
        }
        | Some(text) => {
          parse_due_date(&text)
            .map(Some)
            .ok_or_else(|| {
              serde::de::Error::custom(
                format!(
                  "invalid due date: \
                   {text}"
                )
              )
            })
        }
      }
    }
  }
}

/// Patch fields that can be cleared need three
/// states on the wire: absent, `null`, value.
pub mod nullable {
  use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer
  };

  pub fn serialize<T, S>(
    value: &Option<Option<T>>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    T: Serialize,
    S: Serializer
  {
    match value {
      | Some(inner) => {
        inner.serialize(serializer)
      }
      | None => serializer.serialize_none()
    }
  }

  pub fn deserialize<'de, T, D>(
    deserializer: D
  ) -> Result<Option<Option<T>>, D::Error>
  where
    T: Deserialize<'de>,
    D: Deserializer<'de>
  {
    Option::<T>::deserialize(deserializer)
      .map(Some)
  }
}
