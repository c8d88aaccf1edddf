/*!

This is the long-form manual for `ballot_store` and the `ballotbox` command line program.

## Roles

* **Voters** see whether voting is open, see the roster and cast one vote at a time.
* **Administrators** log in with the administrator password to open or close voting.
  The secure actions (detailed results, vote reset, roster changes, password change)
  ask for the password again each time.

## The roster

A ballot holds up to 32 candidates. Names are trimmed, cannot be empty and must be unique
(the comparison is case sensitive). The order of the roster is the display order only.

Replacing the roster always resets every tally to zero, even for the names that are kept.

## Results

The results are sorted by decreasing number of votes. Candidates with the same number of
votes keep the order of the roster. Each line carries the share of the total, in percent,
rounded to one decimal place, exact ties going to the even digit (0.0 when no vote was cast).

## Files

`ballotbox` keeps three files in its data directory.

### `voting_data.json`

```json
{
  "candidates": ["Alice", "Bob"],
  "votes": { "Alice": 2, "Bob": 1 },
  "total_votes": 3,
  "voting_open": true
}
```

Missing fields take their default values (the ten placeholder candidates, no votes, voting
closed). A file that cannot be read or parsed is replaced by a fresh ballot with a warning.

### `admin_password.json`

```json
{ "password_hash": "<hex SHA-256 of the password>" }
```

When this file is missing or unusable, `ballotbox` asks for a new administrator password
and stops if none is given.

### `voting_log.txt`

One line per administrative action:

```text
[2024-03-05 09:07:01] Voting Opened Manually
```

*/
