use std::str::FromStr;

/// `<index>/<total>` slice of a run.
///
/// Membership is by position in the depth-first case order, which is fixed
/// at registration, so the same shard always selects the same cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shard {
  pub index: usize,
  pub total: usize,
}

impl Shard {
  pub fn includes(&self, position: usize) -> bool {
    position % self.total == self.index
  }

  pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
    items
      .into_iter()
      .enumerate()
      .filter_map(|(position, item)| self.includes(position).then_some(item))
      .collect()
  }
}

impl FromStr for Shard {
  type Err = String;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let (index, total) = raw
      .split_once('/')
      .ok_or_else(|| "shard must be in the form <index>/<total>".to_string())?;
    let index: usize = index
      .trim()
      .parse()
      .map_err(|err| format!("invalid shard index `{index}`: {err}"))?;
    let total: usize = total
      .trim()
      .parse()
      .map_err(|err| format!("invalid shard total `{total}`: {err}"))?;
    if total == 0 {
      return Err("shard total must be greater than zero".into());
    }
    if index >= total {
      return Err(format!(
        "shard index must be less than total ({index} >= {total})"
      ));
    }
    Ok(Self { index, total })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_and_validates() {
    assert_eq!("1/3".parse::<Shard>().unwrap(), Shard { index: 1, total: 3 });
    assert!("3/3"
      .parse::<Shard>()
      .unwrap_err()
      .contains("less than total"));
    assert!("0/0".parse::<Shard>().unwrap_err().contains("greater than zero"));
    assert!("x".parse::<Shard>().unwrap_err().contains("<index>/<total>"));
  }

  #[test]
  fn shards_partition_the_input() {
    let items: Vec<_> = (0..10).collect();
    let mut seen: Vec<_> = (0..3)
      .flat_map(|index| Shard { index, total: 3 }.apply(items.clone()))
      .collect();
    seen.sort();
    assert_eq!(seen, items);
    assert_eq!(Shard { index: 1, total: 3 }.apply(items), vec![1, 4, 7]);
  }
}
